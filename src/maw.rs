//! Minimal absent words through a suffix array.
//!
//! A word `a·u·b` is a minimal absent word of a sequence when it does not occur in it while both
//! `a·u` and `u·b` do. For every suffix array position two factors `u·b` are considered, one per
//! adjacent LCP value, and the left neighbours of the occurrences of `u` and of `u·b` are
//! compared: symbols preceding `u` but never `u·b` give the absent words.

use std::collections::BTreeSet;

use crate::alphabet::{Symbol, SymbolSet};

/// Suffix start positions in lexicographic order of the suffixes.
pub fn suffix_array(sequence: &[Symbol]) -> Vec<usize> {
    let mut suffixes = (0..sequence.len()).collect::<Vec<_>>();
    suffixes.sort_unstable_by(|&a, &b| sequence[a..].cmp(&sequence[b..]));
    suffixes
}

/// Longest common prefix between each suffix and the previous one in the suffix array. The
/// first value is 0.
pub fn lcp_array(sequence: &[Symbol], suffixes: &[usize]) -> Vec<usize> {
    let mut lcp = Vec::with_capacity(suffixes.len());
    if suffixes.is_empty() {
        return lcp;
    }

    lcp.push(0);
    lcp.extend(suffixes.windows(2).map(|pair| {
        sequence[pair[0]..]
            .iter()
            .zip(&sequence[pair[1]..])
            .take_while(|(a, b)| a == b)
            .count()
    }));
    lcp
}

/// Stack of neighbour sets, grouped by the minimum LCP separating them from the current
/// position. Bounds increase from the bottom to the top.
#[derive(Debug, Default)]
struct NeighbourStack(Vec<(usize, SymbolSet)>);

impl NeighbourStack {
    /// Moves to the next position, separated from the previous one by `lcp`.
    fn advance(&mut self, lcp: usize, left: SymbolSet) {
        let mut merged = SymbolSet::EMPTY;
        let mut popped = false;
        while let Some(&(bound, set)) = self.0.last() {
            if bound < lcp {
                break;
            }
            merged |= set;
            popped = true;
            self.0.pop();
        }

        if popped {
            self.0.push((lcp, merged));
        }
        self.0.push((usize::MAX, left));
    }

    /// Neighbours of the positions sharing at least `len` symbols with the current one.
    fn neighbours(&self, len: usize) -> SymbolSet {
        self.0
            .iter()
            .rev()
            .take_while(|&&(bound, _)| bound >= len)
            .fold(SymbolSet::EMPTY, |acc, &(_, set)| acc | set)
    }
}

/// Left neighbours of the occurrences of a slot factor and of the same factor without its last
/// symbol.
#[derive(Debug, Clone, Copy, Default)]
struct SlotSets {
    factor: SymbolSet,
    prefix: SymbolSet,
}

/// Each suffix array position yields up to two factors, of length `lcp + 1` for both adjacent LCP
/// values. Returns the LCP values.
fn slot_lens(lcp: &[usize], rank: usize) -> impl Iterator<Item = usize> {
    [Some(lcp[rank]), lcp.get(rank + 1).copied()]
        .into_iter()
        .flatten()
}

fn collect_sets<I>(
    ranks: I,
    lcp: &[usize],
    left: &[SymbolSet],
    step_lcp: impl Fn(usize) -> usize,
    sets: &mut [SlotSets],
) where
    I: Iterator<Item = usize>,
{
    let mut stack = NeighbourStack::default();
    for rank in ranks {
        stack.advance(step_lcp(rank), left[rank]);
        for (offset, len) in slot_lens(lcp, rank).enumerate() {
            let slot_sets = &mut sets[rank * 2 + offset];
            slot_sets.factor |= stack.neighbours(len + 1);
            slot_sets.prefix |= stack.neighbours(len);
        }
    }
}

/// Minimal absent words of `sequence` with a length in `min_len..=max_len`.
///
/// Absent single symbols are never reported, so lengths below 2 are ignored.
pub fn minimal_absent_words(
    sequence: &[Symbol],
    min_len: usize,
    max_len: usize,
) -> BTreeSet<Vec<Symbol>> {
    let mut words = BTreeSet::new();
    if sequence.is_empty() {
        return words;
    }

    let suffixes = suffix_array(sequence);
    let lcp = lcp_array(sequence, &suffixes);
    let left = suffixes
        .iter()
        .map(|&start| match start {
            0 => SymbolSet::EMPTY,
            _ => SymbolSet::single(sequence[start - 1]),
        })
        .collect::<Vec<_>>();
    let symbols: SymbolSet = sequence.iter().collect();

    let n = sequence.len();
    let mut sets = vec![SlotSets::default(); n * 2];
    // The first position of each pass starts from an empty stack, its LCP is irrelevant.
    collect_sets(0..n, &lcp, &left, |rank| lcp[rank], &mut sets);
    collect_sets(
        (0..n).rev(),
        &lcp,
        &left,
        |rank| lcp.get(rank + 1).copied().unwrap_or(0),
        &mut sets,
    );

    for rank in 0..n {
        for (offset, len) in slot_lens(&lcp, rank).enumerate() {
            let word_len = len + 2;
            let start = suffixes[rank];
            if word_len < min_len.max(2) || word_len > max_len || start + len >= n {
                continue;
            }

            let slot_sets = sets[rank * 2 + offset];
            let prefix = if len == 0 { symbols } else { slot_sets.prefix };
            let factor = &sequence[start..=start + len];
            for symbol in prefix.difference(slot_sets.factor).iter() {
                let mut word = Vec::with_capacity(word_len);
                word.push(symbol);
                word.extend_from_slice(factor);
                words.insert(word);
            }
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use std::ops::Not;

    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;
    use crate::alphabet::{seq, Sequence};

    fn occurs(sequence: &[Symbol], word: &[Symbol]) -> bool {
        word.is_empty() || sequence.windows(word.len()).any(|window| window == word)
    }

    fn brute_force(sequence: &[Symbol], min_len: usize, max_len: usize) -> BTreeSet<Vec<Symbol>> {
        let symbols = sequence.iter().collect::<SymbolSet>();
        let factors = (0..=sequence.len())
            .flat_map(move |start| {
                (start..=sequence.len())
                    .filter(move |&end| end - start + 2 <= max_len)
                    .map(move |end| &sequence[start..end])
            })
            .collect::<BTreeSet<_>>();

        let mut words = BTreeSet::new();
        for factor in factors {
            for a in symbols.iter() {
                for b in symbols.iter() {
                    let mut word = vec![a];
                    word.extend_from_slice(factor);
                    word.push(b);
                    if word.len() >= min_len.max(2)
                        && occurs(sequence, &word).not()
                        && occurs(sequence, &word[1..])
                        && occurs(sequence, &word[..word.len() - 1])
                    {
                        words.insert(word);
                    }
                }
            }
        }
        words
    }

    fn words(sequence: &str, min_len: usize, max_len: usize) -> Vec<String> {
        minimal_absent_words(&seq(sequence), min_len, max_len)
            .iter()
            .map(|word| Sequence(word).to_string())
            .collect()
    }

    #[test]
    fn suffix_and_lcp_arrays() {
        let sequence = seq("ABAB");
        let suffixes = suffix_array(&sequence);
        assert_eq!(suffixes, [2, 0, 3, 1]);
        assert_eq!(lcp_array(&sequence, &suffixes), [0, 2, 0, 1]);
    }

    #[test]
    fn known_absent_words() {
        assert_eq!(words("ABAB", 2, 10), ["AA", "BABA", "BB"]);
        assert_eq!(words("ABAB", 3, 10), ["BABA"]);
        assert_eq!(words("ABAB", 2, 3), ["AA", "BB"]);
        assert_eq!(words("A", 2, 10), ["AA"]);
        assert!(words("", 2, 10).is_empty());
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = SmallRng::seed_from_u64(31);
        for _ in 0..300 {
            let len = rng.gen_range(1..16);
            let symbols = rng.gen_range(1..5);
            let sequence = (0..len)
                .map(|_| Symbol::from_index(rng.gen_range(0..symbols)).unwrap())
                .collect::<Vec<_>>();
            let min_len = rng.gen_range(0..4);
            let max_len = rng.gen_range(min_len..12);

            assert_eq!(
                minimal_absent_words(&sequence, min_len, max_len),
                brute_force(&sequence, min_len, max_len),
                "sequence {}",
                Sequence(&sequence),
            );
        }
    }

    #[test]
    fn deterministic() {
        let sequence = seq("ABCABDABCAB-zzA");
        assert_eq!(
            minimal_absent_words(&sequence, 3, 10),
            minimal_absent_words(&sequence, 3, 10)
        );
    }
}
