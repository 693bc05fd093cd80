//! Subsequence-seed selection by dynamic programming
//!
//! For a window of `w` symbols (`w > k`) the table cell `[i][j]` holds the
//! extremal running-sum values over all ways of choosing `j` of the first
//! `i` window symbols. Only the band `max(1, i-(w-k)) <= j <= min(i, k)` is
//! reachable; everything outside is never read.
//!
//! Each cell records both extremes plus backtracking flags: `*_choose_pre`
//! says the extreme came from `[i-1][j-1]` (the symbol was used) rather than
//! `[i-1][j]`, and `*_from_max` says which side of that predecessor produced
//! it.

use crate::kmer::Kmer;
use crate::rand_table::RandTable;

/// Sentinel extremes for cells whose skip-predecessor does not exist.
const PRUNED_MIN: f64 = 1e15;
const PRUNED_MAX: f64 = -1e15;

/// One cell of the selection table
#[derive(Clone, Copy, Debug, Default)]
pub struct DpCell {
    /// Largest running sum achievable at this cell
    pub max: f64,
    /// Smallest running sum achievable at this cell
    pub min: f64,
    /// `max` was attained via `[i-1][j-1]` (symbol used)
    pub max_choose_pre: bool,
    /// `min` was attained via `[i-1][j-1]` (symbol used)
    pub min_choose_pre: bool,
    /// `max` came from the predecessor's `max` side
    pub max_from_max: bool,
    /// `min` came from the predecessor's `max` side
    pub min_from_max: bool,
}

/// Reusable selection table for windows of up to `n + 1` symbols.
///
/// The scratch covers `(n + 2) * (k + 1)` cells so a single fill over an
/// `(n+1)`-symbol window serves both the length-`n` prefix and the full
/// window, which is what the one-column look-ahead in
/// [`crate::seeds::scan_read`] relies on.
pub struct DpTable {
    k: usize,
    row_len: usize,
    cells: Vec<DpCell>,
}

impl DpTable {
    /// Allocate scratch for base window length `n` and seed length `k`.
    pub fn new(n: usize, k: usize) -> Self {
        assert!(n > k && k >= 1, "window length must exceed seed length");
        DpTable {
            k,
            row_len: k + 1,
            cells: vec![DpCell::default(); (n + 2) * (k + 1)],
        }
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> &DpCell {
        &self.cells[i * self.row_len + j]
    }

    #[inline]
    fn at_mut(&mut self, i: usize, j: usize) -> &mut DpCell {
        &mut self.cells[i * self.row_len + j]
    }

    /// Fill the table for `window` (a slice of 2-bit symbols).
    ///
    /// `window.len()` may be `n` or `n + 1`; after the fill, scores and
    /// backtracks are valid for any row up to `window.len()`.
    pub fn fill(&mut self, window: &[u8], table: &RandTable) {
        let w = window.len();
        let k = self.k;
        debug_assert!(w > k);
        debug_assert!((w + 1) * self.row_len <= self.cells.len());

        let del = w - k;
        self.cells[..(w + 1) * self.row_len].fill(DpCell::default());

        // Base case: the first symbol used as the first seed position.
        let rc = *table.cell(0, window[0] as usize);
        let v = if rc.b2 { rc.a } else { -rc.a };
        {
            let cell = self.at_mut(1, 1);
            cell.min = v;
            cell.max = v;
            cell.min_choose_pre = true;
            cell.max_choose_pre = true;
        }

        for i in 2..=w {
            let minj = if i > del { i - del } else { 1 };
            let maxj = if i < k { i } else { k };

            for j in minj..=maxj {
                // Skip branch: carry [i-1][j] forward.
                let mut cur = if i - 1 < j {
                    DpCell {
                        min: PRUNED_MIN,
                        max: PRUNED_MAX,
                        ..DpCell::default()
                    }
                } else {
                    let mut c = *self.at(i - 1, j);
                    c.min_choose_pre = false;
                    c.max_choose_pre = false;
                    c.max_from_max = true;
                    c.min_from_max = false;
                    c
                };

                // Use branch: extend both extremes of [i-1][j-1] with the
                // current symbol at seed position j-1.
                let prev = *self.at(i - 1, j - 1);
                let rc = *table.cell(j - 1, window[i - 1] as usize);
                let (mut v1, mut v2) = if rc.b1 {
                    (prev.min, prev.max)
                } else {
                    (-prev.min, -prev.max)
                };
                if rc.b2 {
                    v1 += rc.a;
                    v2 += rc.a;
                } else {
                    v1 -= rc.a;
                    v2 -= rc.a;
                }

                if v1 < v2 {
                    if v1 <= cur.min {
                        cur.min = v1;
                        cur.min_choose_pre = true;
                        cur.min_from_max = false;
                    }
                    if v2 >= cur.max {
                        cur.max = v2;
                        cur.max_choose_pre = true;
                        cur.max_from_max = true;
                    }
                } else {
                    if v2 <= cur.min {
                        cur.min = v2;
                        cur.min_choose_pre = true;
                        cur.min_from_max = true;
                    }
                    if v1 >= cur.max {
                        cur.max = v1;
                        cur.max_choose_pre = true;
                        cur.max_from_max = false;
                    }
                }

                *self.at_mut(i, j) = cur;
            }
        }
    }

    /// Score of the seed selected for the length-`w` window: the larger of
    /// `|min|` and `max` at `[w][k]`, with `|min|` winning ties.
    pub fn selected_score(&self, w: usize) -> f64 {
        let cell = self.at(w, self.k);
        let score = cell.min.abs();
        if score < cell.max {
            cell.max
        } else {
            score
        }
    }

    /// Backtrack the selected seed for the length-`w` window.
    ///
    /// Returns the packed seed and whether the walk consumed the first
    /// window symbol (which is what decides whether the look-ahead seed is
    /// reusable for the next start position).
    pub fn backtrack(&self, window: &[u8], w: usize) -> (Kmer, bool) {
        self.walk(window, w, |_, _| {})
    }

    /// Like [`Self::backtrack`], but also records the absolute read position
    /// of each chosen symbol. `st` is the window's start offset in the read;
    /// `pos` must hold at least `k` entries.
    pub fn backtrack_with_positions(
        &self,
        window: &[u8],
        w: usize,
        st: usize,
        pos: &mut [usize],
    ) -> (Kmer, bool) {
        debug_assert!(pos.len() >= self.k);
        self.walk(window, w, |slot, window_idx| {
            pos[slot] = st + window_idx;
        })
    }

    fn walk<F: FnMut(usize, usize)>(
        &self,
        window: &[u8],
        w: usize,
        mut on_pick: F,
    ) -> (Kmer, bool) {
        let k = self.k;
        debug_assert!(window.len() >= w);

        let (mut select, mut from_max) = {
            let cell = self.at(w, k);
            if cell.max > cell.min.abs() {
                (cell.max_choose_pre, cell.max_from_max)
            } else {
                (cell.min_choose_pre, cell.min_from_max)
            }
        };

        let mut bits: u128 = 0;
        let mut row = w;
        let mut col = k;
        let mut emitted = 0usize;

        while emitted < k {
            if select {
                bits |= (window[row - 1] as u128) << (emitted << 1);
                on_pick(k - 1 - emitted, row - 1);
                emitted += 1;
                col -= 1;
            }
            row -= 1;

            let cell = self.at(row, col);
            if from_max {
                select = cell.max_choose_pre;
                from_max = cell.max_from_max;
            } else {
                select = cell.min_choose_pre;
                from_max = cell.min_from_max;
            }
        }

        (Kmer::from_bits(bits), row == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Score of an explicit symbol subsequence under the table recurrence.
    fn omega_of(symbols: &[u8], table: &RandTable) -> f64 {
        let mut omega = 0.0f64;
        for (i, &sym) in symbols.iter().enumerate() {
            let cell = table.cell(i, sym as usize);
            omega = if cell.b1 { omega } else { -omega } + if cell.b2 { cell.a } else { -cell.a };
        }
        omega
    }

    /// Best |omega| over all length-k subsequences of the window.
    fn brute_force_best(window: &[u8], k: usize, table: &RandTable) -> f64 {
        fn recurse(
            window: &[u8],
            start: usize,
            chosen: &mut Vec<u8>,
            k: usize,
            table: &RandTable,
            best: &mut f64,
        ) {
            if chosen.len() == k {
                let s = omega_of(chosen, table).abs();
                if s > *best {
                    *best = s;
                }
                return;
            }
            let needed = k - chosen.len();
            for i in start..=window.len() - needed {
                chosen.push(window[i]);
                recurse(window, i + 1, chosen, k, table, best);
                chosen.pop();
            }
        }
        let mut best = 0.0f64;
        recurse(window, 0, &mut Vec::new(), k, table, &mut best);
        best
    }

    fn symbols_of(s: &str) -> Vec<u8> {
        crate::encoding::encode_symbols(s.as_bytes()).unwrap()
    }

    #[test]
    fn test_selector_matches_brute_force() {
        let k = 3;
        let table = RandTable::generate(k, 2024);
        let windows = ["GATTACAC", "ACGTACGT", "TTTGGCAA", "CCCCAGTA"];

        for win in windows {
            let syms = symbols_of(win);
            let mut dp = DpTable::new(syms.len(), k);
            dp.fill(&syms, &table);

            let (seed, _) = dp.backtrack(&syms, syms.len());
            let dp_score = table.score(seed, k);
            let best = brute_force_best(&syms, k, &table);
            assert!(
                (dp_score - best).abs() < 1e-6,
                "window {}: dp {} vs brute force {}",
                win,
                dp_score,
                best
            );
            assert!((dp.selected_score(syms.len()) - best).abs() < 1e-6);
        }
    }

    #[test]
    fn test_backtrack_is_a_subsequence() {
        let k = 4;
        let table = RandTable::generate(k, 11);
        let syms = symbols_of("GTCAGTACGA");
        let mut dp = DpTable::new(syms.len(), k);
        dp.fill(&syms, &table);

        let mut pos = vec![0usize; k];
        let (seed, _) = dp.backtrack_with_positions(&syms, syms.len(), 0, &mut pos);

        // Positions are strictly increasing and reproduce the seed.
        for w in pos.windows(2) {
            assert!(w[0] < w[1]);
        }
        let picked: Vec<u8> = pos.iter().map(|&p| syms[p]).collect();
        assert_eq!(Kmer::from_symbols(&picked), seed);
    }

    #[test]
    fn test_positions_honor_offset() {
        let k = 2;
        let table = RandTable::generate(k, 5);
        let syms = symbols_of("ACGTT");
        let mut dp = DpTable::new(syms.len(), k);
        dp.fill(&syms, &table);

        let mut at_zero = vec![0usize; k];
        let mut at_ten = vec![0usize; k];
        dp.backtrack_with_positions(&syms, syms.len(), 0, &mut at_zero);
        dp.backtrack_with_positions(&syms, syms.len(), 10, &mut at_ten);
        for i in 0..k {
            assert_eq!(at_zero[i] + 10, at_ten[i]);
        }
    }

    #[test]
    fn test_prefix_and_full_window_from_one_fill() {
        // One fill over n+1 symbols must serve extraction at both rows.
        let k = 3;
        let n = 6;
        let table = RandTable::generate(k, 31);
        let syms = symbols_of("ACGGTAC"); // n + 1 symbols

        let mut dp = DpTable::new(n, k);
        dp.fill(&syms, &table);
        let (full_seed, _) = dp.backtrack(&syms, n + 1);
        let (prefix_seed, _) = dp.backtrack(&syms, n);

        // The prefix result must agree with a standalone length-n fill.
        let mut dp2 = DpTable::new(n, k);
        dp2.fill(&syms[..n], &table);
        let (standalone, _) = dp2.backtrack(&syms[..n], n);
        assert_eq!(prefix_seed, standalone);

        // Both are optimal over their own windows.
        assert!((table.score(full_seed, k) - brute_force_best(&syms, k, &table)).abs() < 1e-6);
        assert!(
            (table.score(prefix_seed, k) - brute_force_best(&syms[..n], k, &table)).abs() < 1e-6
        );
    }

    #[test]
    fn test_uniform_window_selects_uniform_seed() {
        let k = 3;
        let table = RandTable::generate(k, 8);
        let syms = symbols_of("AAAAAA");
        let mut dp = DpTable::new(syms.len(), k);
        dp.fill(&syms, &table);
        let (seed, _) = dp.backtrack(&syms, syms.len());
        assert_eq!(seed, Kmer::from_string("AAA").unwrap());
    }
}
