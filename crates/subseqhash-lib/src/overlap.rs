//! Shared-seed overlap counting
//!
//! Counts, for every ordered read pair, how many seeds the two reads share.
//! To avoid crediting transitive triples, each seed's occurrences are sorted
//! by descending position and only adjacent pairs in that order are counted:
//! a seed on reads A, B, C at positions pA > pB > pC credits (A,B) and
//! (B,C) but not (A,C).

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::kmer::Kmer;
use crate::seed_files::Occurrence;

/// An upper-triangular matrix without the main diagonal, flattened.
///
/// Valid indices for `(i, j)` are `1 <= i < j <= n`.
pub struct OverlapTable {
    n: usize,
    counts: Vec<u32>,
}

impl OverlapTable {
    /// Allocate a zeroed table over `n` reads.
    pub fn new(n: usize) -> Self {
        OverlapTable {
            n,
            counts: vec![0; n * (n - 1) / 2],
        }
    }

    /// Number of reads this table covers.
    pub fn num_reads(&self) -> usize {
        self.n
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(1 <= i && i < j && j <= self.n);
        ((2 * self.n - i) * (i - 1)) / 2 + j - i - 1
    }

    /// Add one to the count of pair `(i, j)`.
    #[inline]
    pub fn increment(&mut self, i: usize, j: usize) {
        let idx = self.index(i, j);
        self.counts[idx] += 1;
    }

    /// Current count of pair `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.counts[self.index(i, j)]
    }

    /// Iterate the nonzero entries as `(i, j, count)` in index order.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        let n = self.n;
        let mut i = 1usize;
        let mut j = 2usize;
        self.counts.iter().filter_map(move |&count| {
            let entry = (i, j, count);
            j += 1;
            if j > n {
                i += 1;
                j = i + 1;
            }
            (entry.2 > 0).then_some(entry)
        })
    }
}

/// Count shared seeds over the merged occurrence map.
///
/// Returns the forward table (first-seen read smaller) and the reverse
/// table (first-seen read larger). Occurrence lists are sorted in place by
/// descending position; occurrences of the same read never credit a pair.
pub fn count_shared_seeds(
    all_seeds: &mut BTreeMap<Kmer, Vec<Occurrence>>,
    num_reads: usize,
) -> (OverlapTable, OverlapTable) {
    let mut forward = OverlapTable::new(num_reads);
    let mut reverse = OverlapTable::new(num_reads);

    for occurrences in all_seeds.values_mut() {
        if occurrences.len() < 2 {
            continue;
        }
        occurrences.sort_unstable_by(|a, b| b.pos.cmp(&a.pos));

        let mut a = occurrences[0].read_id as usize;
        for occ in &occurrences[1..] {
            let b = occ.read_id as usize;
            if a < b {
                forward.increment(a, b);
            } else if b < a {
                reverse.increment(b, a);
            }
            a = b;
        }
    }

    (forward, reverse)
}

/// Write the nonzero entries of both tables as `"i j count"` lines, sorted
/// by `(i, j)` with ties kept distinct.
pub fn write_sorted_pairs<W: Write>(
    writer: &mut W,
    forward: &OverlapTable,
    reverse: &OverlapTable,
) -> io::Result<()> {
    let mut entries: Vec<(usize, usize, u32)> = forward.nonzero().collect();
    entries.extend(reverse.nonzero());
    entries.sort_unstable();

    for (i, j, count) in entries {
        writeln!(writer, "{} {} {}", i, j, count)?;
    }
    Ok(())
}
