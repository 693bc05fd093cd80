//! Random score table
//!
//! The table assigns, for every seed position `i` in `[0, k)` and symbol `c`
//! in `[0, 4)`, a triple `(A, B1, B2)`: an amplitude drawn uniformly from
//! `[2^30, 2^31)` and two signs. For each position the four `(B1, B2)` pairs
//! across the symbols are a permutation of the four sign combinations, which
//! makes the resulting score a deterministic total order on k-mers.
//!
//! # File format
//!
//! `k * 4` fixed-size records in position-major order, each record
//! `f64 (LE) + u8 + u8` = 10 bytes. A payload smaller than
//! `k * 4 * 10` bytes fails the load.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::constants::ALPHABET_SIZE;
use crate::kmer::Kmer;

/// On-disk size of one table cell in bytes
pub const RAND_CELL_BYTES: usize = 10;

/// Errors from loading a score table
#[derive(Error, Debug)]
pub enum TableError {
    /// The file payload is smaller than `k * 4` records
    #[error("rand table in {path} is too small: expected {expected} bytes")]
    Short {
        /// Path of the offending file
        path: String,
        /// Number of bytes a complete table requires
        expected: u64,
    },
    /// An underlying I/O failure
    #[error("error reading rand table: {0}")]
    Io(#[from] io::Error),
}

/// One table entry: amplitude plus the two signs (`true` is +1)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandCell {
    /// Amplitude in `[2^30, 2^31)`
    pub a: f64,
    /// Sign applied to the running sum
    pub b1: bool,
    /// Sign applied to the amplitude
    pub b2: bool,
}

/// The full `k x 4` score table
#[derive(Clone, Debug)]
pub struct RandTable {
    k: usize,
    cells: Vec<RandCell>,
}

/// Linear congruential generator, same multiplier the benchmark paths use.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    /// Uniform draw in `[0, 1)` from the top 53 bits.
    #[inline]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform index in `[0, bound)`.
    #[inline]
    fn next_index(&mut self, bound: usize) -> usize {
        ((self.next_u64() >> 33) as usize) % bound
    }
}

impl RandTable {
    /// Generate a table deterministically from a seed.
    ///
    /// Amplitudes are uniform in `[2^30, 2^31)`; for each position the four
    /// sign pairs are a shuffled permutation of
    /// `{(+,+), (+,-), (-,+), (-,-)}`.
    pub fn generate(k: usize, seed: u64) -> Self {
        let mut rng = Lcg::new(seed);
        let mut cells = Vec::with_capacity(k * ALPHABET_SIZE);

        let base = (1u64 << 30) as f64;
        let mut signs = [0usize; ALPHABET_SIZE];

        for _ in 0..k {
            let mut amplitudes = [0.0f64; ALPHABET_SIZE];
            for a in amplitudes.iter_mut() {
                *a = base * (1.0 + rng.next_f64());
            }

            for (j, s) in signs.iter_mut().enumerate() {
                *s = j;
            }
            // Fisher-Yates over the four sign combinations
            for j in (1..ALPHABET_SIZE).rev() {
                let r = rng.next_index(j + 1);
                signs.swap(j, r);
            }

            for j in 0..ALPHABET_SIZE {
                cells.push(RandCell {
                    a: amplitudes[j],
                    b1: signs[j] % 2 == 1,
                    b2: signs[j] / 2 == 1,
                });
            }
        }

        RandTable { k, cells }
    }

    /// Generate a table seeded from the system clock.
    pub fn from_entropy(k: usize) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;
        Self::generate(k, seed)
    }

    /// Seed length this table scores.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Entry for seed position `pos` and symbol `sym`.
    #[inline]
    pub fn cell(&self, pos: usize, sym: usize) -> &RandCell {
        &self.cells[pos * ALPHABET_SIZE + sym]
    }

    /// Write the table to `path` in the fixed binary format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for cell in &self.cells {
            writer.write_all(&cell.a.to_le_bytes())?;
            writer.write_all(&[cell.b1 as u8, cell.b2 as u8])?;
        }
        writer.flush()
    }

    /// Load a table for seed length `k` from `path`.
    ///
    /// # Errors
    /// [`TableError::Short`] if the payload holds fewer than `k * 4`
    /// records, [`TableError::Io`] for any other read failure.
    pub fn load<P: AsRef<Path>>(path: P, k: usize) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let num_cells = k * ALPHABET_SIZE;
        let mut cells = Vec::with_capacity(num_cells);
        let mut record = [0u8; RAND_CELL_BYTES];

        for _ in 0..num_cells {
            if let Err(e) = reader.read_exact(&mut record) {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    return Err(TableError::Short {
                        path: path.display().to_string(),
                        expected: (num_cells * RAND_CELL_BYTES) as u64,
                    });
                }
                return Err(TableError::Io(e));
            }
            let mut a_bytes = [0u8; 8];
            a_bytes.copy_from_slice(&record[..8]);
            cells.push(RandCell {
                a: f64::from_le_bytes(a_bytes),
                b1: record[8] != 0,
                b2: record[9] != 0,
            });
        }

        Ok(RandTable { k, cells })
    }

    /// Score a length-`k` seed: the magnitude of the running sum
    /// `omega <- (B1 ? omega : -omega) + (B2 ? A : -A)` taken over the seed's
    /// symbols front to back.
    pub fn score(&self, seed: Kmer, k: usize) -> f64 {
        debug_assert_eq!(k, self.k);
        let mut omega = 0.0f64;
        for i in 0..k {
            let cell = self.cell(i, seed.symbol_at(k, i) as usize);
            omega = if cell.b1 { omega } else { -omega } + if cell.b2 { cell.a } else { -cell.a };
        }
        omega.abs()
    }
}
