//! DNA nucleotide encoding
//!
//! The 2-bit encoding used throughout the seed pipeline:
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 10
//! - T (84/116) -> 11

use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("Invalid DNA base: {0:?}")]
    InvalidBase(u8),
    /// The input string length does not match the expected seed length
    #[error("Seed length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected seed length
        expected: usize,
        /// Actual string length
        actual: usize,
    },
}

/// Encode a single DNA nucleotide to its 2-bit symbol
#[inline]
pub const fn encode_base(base: u8) -> Result<u8, EncodingError> {
    match base {
        b'A' | b'a' => Ok(0b00),
        b'C' | b'c' => Ok(0b01),
        b'G' | b'g' => Ok(0b10),
        b'T' | b't' => Ok(0b11),
        _ => Err(EncodingError::InvalidBase(base)),
    }
}

/// Decode a 2-bit symbol to its DNA nucleotide (uppercase)
#[inline]
pub const fn decode_base(sym: u8) -> u8 {
    match sym & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'G',
        _ => b'T',
    }
}

/// Encode a DNA sequence to a vector of 2-bit symbols, one byte per base.
///
/// This is the working representation the seed selector consumes; packing
/// into a k-mer integer happens only for selected seeds.
///
/// # Errors
/// Returns an error on the first non-ACGT byte.
pub fn encode_symbols(sequence: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut symbols = Vec::with_capacity(sequence.len());
    for &base in sequence {
        symbols.push(encode_base(base)?);
    }
    Ok(symbols)
}
