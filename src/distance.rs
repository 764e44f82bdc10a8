use std::mem;

use crate::alphabet::{Symbol, SymbolSet};

/// Unit-cost edit distance between two sequences.
pub fn levenshtein(a: &[Symbol], b: &[Symbol]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut cur = vec![0; b.len() + 1];
    for (i, &a_symbol) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &b_symbol) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(a_symbol != b_symbol);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

/// Edit distance restricted to the band of cells that can belong to an alignment within
/// `threshold` edits.
///
/// Returns the exact distance when it does not exceed `threshold`, `threshold + 1` otherwise.
pub fn length_aware_edit_distance(a: &[Symbol], b: &[Symbol], threshold: usize) -> usize {
    const UNREACHABLE: usize = usize::MAX / 2;

    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let cap = threshold + 1;
    let delta = long.len() - short.len();
    if delta > threshold {
        return cap;
    }
    if short.is_empty() {
        return long.len().min(cap);
    }

    let columns = long.len();
    let lower_reach = (threshold - delta) / 2;
    let upper_reach = (threshold + delta) / 2;

    let mut prev = (0..=columns).collect::<Vec<_>>();
    let mut cur = vec![UNREACHABLE; columns + 1];
    for (i, &short_symbol) in short.iter().enumerate() {
        let row = i + 1;
        let lower = row.saturating_sub(lower_reach);
        let upper = (row + upper_reach).min(columns);

        let mut row_min = UNREACHABLE;
        for column in lower..=upper {
            let value = if column == 0 {
                prev[0] + 1
            } else {
                let substitution =
                    prev[column - 1] + usize::from(short_symbol != long[column - 1]);
                let deletion = prev[column] + 1;
                let insertion = if column > lower {
                    cur[column - 1] + 1
                } else {
                    UNREACHABLE
                };
                substitution.min(deletion).min(insertion)
            };

            cur[column] = value;
            row_min = row_min.min(value);
        }

        if row_min > threshold {
            return cap;
        }

        if upper < columns {
            cur[upper + 1] = UNREACHABLE;
        }
        mem::swap(&mut prev, &mut cur);
    }

    prev[columns].min(cap)
}

/// Minimum edit distance between `pattern` and any substring of `window`.
pub fn substring_edit_distance(window: &[Symbol], pattern: &[Symbol]) -> usize {
    let mut prev = (0..=pattern.len()).collect::<Vec<_>>();
    let mut cur = vec![0; pattern.len() + 1];
    let mut best = pattern.len();

    for &window_symbol in window {
        cur[0] = 0;
        for (j, &pattern_symbol) in pattern.iter().enumerate() {
            let substitution = prev[j] + usize::from(window_symbol != pattern_symbol);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        best = best.min(cur[pattern.len()]);
        mem::swap(&mut prev, &mut cur);
    }

    best
}

/// Cheap lower bound on the edit distance between `pattern` and the substrings of `window`
/// with the same length, based on the symbols they contain.
///
/// Returns 0 when `window` is shorter than `pattern`.
pub fn substring_hamming_bound(window: &[Symbol], pattern: &[Symbol]) -> f64 {
    if pattern.is_empty() || window.len() < pattern.len() {
        return 0.;
    }

    let pattern_set: SymbolSet = pattern.iter().collect();
    let min_difference = window
        .windows(pattern.len())
        .map(|substring| {
            substring
                .iter()
                .collect::<SymbolSet>()
                .symmetric_difference(pattern_set)
                .len()
        })
        .min()
        .unwrap_or(0);

    f64::from(min_difference) / 2.
}
