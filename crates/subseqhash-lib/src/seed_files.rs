//! Per-read seed files
//!
//! Each read's retained seeds are stored in their own file as packed
//! fixed-size records with no header, in ascending window position:
//!
//! ```text
//! value: 16 bytes (u128 LE) | pos: u32 LE | span: u32 LE   = 24 bytes
//! ```
//!
//! The read id is carried by the file name (`<read_id>.subseqseed`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::kmer::Kmer;
use crate::seeds::Seed;

/// On-disk size of one seed record in bytes
pub const SEED_RECORD_BYTES: usize = 24;

/// Errors from reading a seed file
#[derive(Error, Debug)]
pub enum SeedFileError {
    /// The file ended in the middle of a record
    #[error("truncated seed record in {path}")]
    Truncated {
        /// Path of the offending file
        path: String,
    },
    /// An underlying I/O failure
    #[error("error reading seed file: {0}")]
    Io(#[from] io::Error),
}

/// One occurrence of a seed: which read and at which window position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurrence {
    /// Read the seed was selected on
    pub read_id: u64,
    /// Window start position on that read
    pub pos: u64,
}

/// Write a read's seed list to `path`.
pub fn save_seeds<P: AsRef<Path>>(path: P, seeds: &[Seed]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for seed in seeds {
        writer.write_all(&seed.value.to_le_bytes())?;
        writer.write_all(&seed.pos.to_le_bytes())?;
        writer.write_all(&seed.span.to_le_bytes())?;
    }
    writer.flush()
}

/// Read one record; `Ok(None)` on clean end of file.
fn read_record<R: Read>(
    reader: &mut R,
    path: &Path,
) -> Result<Option<Seed>, SeedFileError> {
    let mut buf = [0u8; SEED_RECORD_BYTES];
    let mut filled = 0usize;
    while filled < SEED_RECORD_BYTES {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(SeedFileError::Truncated {
                    path: path.display().to_string(),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SeedFileError::Io(e)),
        }
    }

    let mut value = [0u8; 16];
    value.copy_from_slice(&buf[..16]);
    let mut pos = [0u8; 4];
    pos.copy_from_slice(&buf[16..20]);
    let mut span = [0u8; 4];
    span.copy_from_slice(&buf[20..24]);

    Ok(Some(Seed {
        value: Kmer::from_le_bytes(value),
        pos: u32::from_le_bytes(pos),
        span: u32::from_le_bytes(span),
    }))
}

/// Load a read's seed list from `path`.
pub fn load_seeds<P: AsRef<Path>>(path: P) -> Result<Vec<Seed>, SeedFileError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut seeds = Vec::new();
    while let Some(seed) = read_record(&mut reader, path)? {
        seeds.push(seed);
    }
    Ok(seeds)
}

/// Merge the occurrences of one read's seed file into `all_seeds`.
///
/// Must be called in ascending `read_id` order so every per-seed occurrence
/// list stays sorted by read id.
pub fn load_occurrences<P: AsRef<Path>>(
    path: P,
    read_id: u64,
    all_seeds: &mut BTreeMap<Kmer, Vec<Occurrence>>,
) -> Result<(), SeedFileError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    while let Some(seed) = read_record(&mut reader, path)? {
        all_seeds.entry(seed.value).or_default().push(Occurrence {
            read_id,
            pos: seed.pos as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn sample_seeds() -> Vec<Seed> {
        vec![
            Seed {
                value: Kmer::from_string("ACG").unwrap(),
                pos: 0,
                span: 2,
            },
            Seed {
                value: Kmer::from_string("GTT").unwrap(),
                pos: 5,
                span: 1,
            },
            Seed {
                value: Kmer::from_string("ACG").unwrap(),
                pos: 11,
                span: 3,
            },
        ]
    }

    #[test]
    fn test_save_load_roundtrip() {
        let seeds = sample_seeds();
        let file = NamedTempFile::new().unwrap();
        save_seeds(file.path(), &seeds).unwrap();
        let loaded = load_seeds(file.path()).unwrap();
        assert_eq!(loaded, seeds);
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        save_seeds(file.path(), &[]).unwrap();
        assert!(load_seeds(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_record() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; SEED_RECORD_BYTES + 7]).unwrap();
        file.flush().unwrap();
        match load_seeds(file.path()) {
            Err(SeedFileError::Truncated { .. }) => {}
            other => panic!("expected Truncated, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_load_occurrences_merges_by_seed() {
        let shared = Kmer::from_string("TTA").unwrap();
        let only_first = Kmer::from_string("CCC").unwrap();

        let f1 = NamedTempFile::new().unwrap();
        save_seeds(
            f1.path(),
            &[
                Seed { value: shared, pos: 4, span: 1 },
                Seed { value: only_first, pos: 9, span: 1 },
            ],
        )
        .unwrap();

        let f2 = NamedTempFile::new().unwrap();
        save_seeds(f2.path(), &[Seed { value: shared, pos: 12, span: 2 }]).unwrap();

        let mut all = BTreeMap::new();
        load_occurrences(f1.path(), 1, &mut all).unwrap();
        load_occurrences(f2.path(), 2, &mut all).unwrap();

        assert_eq!(
            all.get(&shared).unwrap(),
            &vec![
                Occurrence { read_id: 1, pos: 4 },
                Occurrence { read_id: 2, pos: 12 },
            ]
        );
        assert_eq!(
            all.get(&only_first).unwrap(),
            &vec![Occurrence { read_id: 1, pos: 9 }]
        );
    }
}
