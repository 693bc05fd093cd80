//! Seed extraction over a read
//!
//! Walks a read window by window, selecting one subsequence seed per
//! length-`n` window and keeping those whose score meets the threshold.
//!
//! Each DP fill covers `n + 1` symbols so that two seeds are extractable per
//! call: the one for the current window and the one for the window shifted
//! by one. When the shifted seed passes the threshold and its backtrack does
//! not consume the first window symbol, it is also the selection for the
//! next start position and that position's fill is skipped. When even the
//! shifted score misses the threshold the next position is skipped outright,
//! since dropping a symbol cannot raise the score.

use crate::dp::DpTable;
use crate::kmer::Kmer;
use crate::rand_table::RandTable;

/// One retained seed of a read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seed {
    /// The selected k-mer
    pub value: Kmer,
    /// Start position of the generating window
    pub pos: u32,
    /// Number of consecutive generating windows that all selected this value
    pub span: u32,
}

/// Walk `symbols` and call `emit(value, window_start)` for every
/// threshold-passing seed, in ascending window order.
///
/// A read shorter than `n` symbols emits nothing.
pub fn scan_read<F>(
    symbols: &[u8],
    n: usize,
    k: usize,
    table: &RandTable,
    threshold: f64,
    mut emit: F,
) where
    F: FnMut(Kmer, u32),
{
    let len = symbols.len();
    if len < n {
        return;
    }

    let mut dp = DpTable::new(n, k);
    let mut i = 0usize;

    while i + n < len {
        let window = &symbols[i..=i + n];
        dp.fill(window, table);

        if dp.selected_score(n) >= threshold {
            let (seed, _) = dp.backtrack(window, n);
            emit(seed, i as u32);
        }

        if dp.selected_score(n + 1) >= threshold {
            let (seed, used_first) = dp.backtrack(window, n + 1);
            if !used_first {
                // Same selection holds for the window starting one later.
                i += 1;
                emit(seed, i as u32);
            }
        } else {
            i += 1;
        }
        i += 1;
    }

    // The final window is processed on its own unless the look-ahead above
    // already stepped past it.
    if i + n == len {
        let window = &symbols[i..i + n];
        dp.fill(window, table);
        if dp.selected_score(n) >= threshold {
            let (seed, _) = dp.backtrack(window, n);
            emit(seed, i as u32);
        }
    }
}

/// Extract the coalesced seed list of a read.
///
/// Consecutive emissions with the same value are merged into one [`Seed`]
/// whose `span` counts the contributing windows; `pos` is the first of them.
pub fn extract_seeds(
    symbols: &[u8],
    n: usize,
    k: usize,
    table: &RandTable,
    threshold: f64,
) -> Vec<Seed> {
    let mut seeds: Vec<Seed> = Vec::new();
    scan_read(symbols, n, k, table, threshold, |value, pos| {
        if let Some(last) = seeds.last_mut() {
            if last.value == value {
                last.span += 1;
                return;
            }
        }
        seeds.push(Seed {
            value,
            pos,
            span: 1,
        });
    });
    seeds
}
