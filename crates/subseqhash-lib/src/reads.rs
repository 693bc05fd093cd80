//! Read input
//!
//! Reads arrive in a FASTA-style file: a header line starting with `>`
//! whose leading characters give a numeric read id, followed by the
//! nucleotide sequence. When the header does not start with digits the
//! 1-based record ordinal is used instead.
//!
//! Reads containing non-ACGT characters are skipped with a warning; the
//! rest of the file keeps processing.

use anyhow::{Context, Result};
use needletail::parse_fastx_file;
use std::path::Path;
use tracing::warn;

use crate::encoding::encode_symbols;

/// Parse the leading decimal digits of a header as the read id.
fn parse_read_id(header: &[u8]) -> Option<u64> {
    let digits: &[u8] = match header.iter().position(|b| !b.is_ascii_digit()) {
        Some(0) => return None,
        Some(end) => &header[..end],
        None if header.is_empty() => return None,
        None => header,
    };
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Parse a read file and call `callback(read_id, symbols)` for each read,
/// where `symbols` is the sequence encoded as 2-bit symbols.
///
/// # Errors
/// Returns an error if the file cannot be opened or a record cannot be
/// parsed; a read with an invalid alphabet is skipped, not fatal.
pub fn for_each_read<P, F>(path: P, mut callback: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(u64, Vec<u8>) -> Result<()>,
{
    let path = path.as_ref();
    let mut reader = parse_fastx_file(path)
        .with_context(|| format!("Failed to open read file: {}", path.display()))?;

    let mut ordinal: u64 = 0;
    while let Some(record) = reader.next() {
        let record = record
            .with_context(|| format!("Failed to parse read record in {}", path.display()))?;
        ordinal += 1;

        let read_id = parse_read_id(record.id()).unwrap_or(ordinal);
        let seq = record.seq();
        let symbols = match encode_symbols(&seq) {
            Ok(symbols) => symbols,
            Err(e) => {
                warn!("skipping read {}: {}", read_id, e);
                continue;
            }
        };

        callback(read_id, symbols)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_read_id() {
        assert_eq!(parse_read_id(b"17"), Some(17));
        assert_eq!(parse_read_id(b"3 extra header text"), Some(3));
        assert_eq!(parse_read_id(b"42_suffix"), Some(42));
        assert_eq!(parse_read_id(b"read7"), None);
        assert_eq!(parse_read_id(b""), None);
    }

    #[test]
    fn test_for_each_read_numeric_ids() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, ">1 first")?;
        writeln!(file, "ACGTACGT")?;
        writeln!(file, ">2 second")?;
        writeln!(file, "TTTTAAAA")?;
        file.flush()?;

        let mut seen = Vec::new();
        for_each_read(file.path(), |id, symbols| {
            seen.push((id, symbols.len()));
            Ok(())
        })?;

        assert_eq!(seen, vec![(1, 8), (2, 8)]);
        Ok(())
    }

    #[test]
    fn test_for_each_read_ordinal_fallback() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, ">readA")?;
        writeln!(file, "ACGT")?;
        writeln!(file, ">readB")?;
        writeln!(file, "GGCC")?;
        file.flush()?;

        let mut ids = Vec::new();
        for_each_read(file.path(), |id, _| {
            ids.push(id);
            Ok(())
        })?;

        assert_eq!(ids, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_invalid_alphabet_is_skipped() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, ">1")?;
        writeln!(file, "ACGTNNNN")?;
        writeln!(file, ">2")?;
        writeln!(file, "ACGTACGT")?;
        file.flush()?;

        let mut ids = Vec::new();
        for_each_read(file.path(), |id, _| {
            ids.push(id);
            Ok(())
        })?;

        assert_eq!(ids, vec![2]);
        Ok(())
    }
}
