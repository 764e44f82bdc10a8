use std::{
    collections::BTreeMap,
    ops::Not,
    time::{Duration, Instant},
};

use fnv::FnvHashMap;
use tracing::{debug, info};

use crate::{
    alphabet::Symbol,
    corpus::{Corpus, EntryId},
    distance::length_aware_edit_distance,
    engine::SimilaritySearch,
    pigeonring::{Candidate, FilterPolicy, Segment},
    search_result::{Ranking, SearchResult},
    Error,
};

/// Parameters shared by the partition-based joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinParams {
    /// Maximum edit distance of a reported entry.
    pub threshold: usize,
    pub filter: FilterPolicy,
}

impl JoinParams {
    pub fn new(threshold: usize, filter: FilterPolicy) -> Result<Self, Error> {
        if let FilterPolicy::Pigeonring { chain_length, .. } = filter {
            if chain_length > threshold + 1 {
                return Err(Error::InvalidConfiguration(format!(
                    "chain length ({chain_length}) cannot exceed the number of boxes ({})",
                    threshold + 1
                )));
            }
        }

        Ok(Self { threshold, filter })
    }
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            threshold: 2,
            filter: FilterPolicy::default(),
        }
    }
}

/// Splits a length into `parts` consecutive segments, the shorter ones first.
pub fn partition(len: usize, parts: usize) -> Vec<Segment> {
    let short_len = len / parts;
    let long_segments = len - short_len * parts;
    let short_segments = parts - long_segments;

    (0..parts)
        .scan(0, |start, index| {
            let len = if index < short_segments {
                short_len
            } else {
                short_len + 1
            };
            let segment = Segment { start: *start, len };
            *start += len;
            Some(segment)
        })
        .collect()
}

type SegmentIndex = FnvHashMap<Vec<Symbol>, Vec<EntryId>>;

#[derive(Debug)]
struct LengthGroup {
    segments: Vec<Segment>,
    indices: Vec<SegmentIndex>,
}

/// Threshold search through segment partitioning (PassJoin).
///
/// Every entry is split into `threshold + 1` segments: an entry within the threshold must
/// contain at least one of them unchanged, and the query positions where it can occur are
/// bounded by the segment ordinal and the length difference.
#[derive(Debug)]
pub struct PassJoinSearch<'a> {
    corpus: &'a Corpus,
    params: JoinParams,
    groups: BTreeMap<usize, LengthGroup>,
    index_duration: Duration,
}

impl<'a> PassJoinSearch<'a> {
    pub fn new(corpus: &'a Corpus, params: JoinParams) -> Self {
        let start = Instant::now();
        let parts = params.threshold + 1;

        let mut order = (0..corpus.len()).map(EntryId).collect::<Vec<_>>();
        order.sort_by(|&a, &b| {
            let (a, b) = (corpus.entry(a), corpus.entry(b));
            a.len()
                .cmp(&b.len())
                .then_with(|| a.sequence().cmp(b.sequence()))
        });

        let mut groups = BTreeMap::new();
        for id in order {
            let sequence = corpus.entry(id).sequence();
            let group = groups
                .entry(sequence.len())
                .or_insert_with(|| LengthGroup {
                    segments: partition(sequence.len(), parts),
                    indices: vec![SegmentIndex::default(); parts],
                });

            for (segment, index) in group.segments.iter().zip(&mut group.indices) {
                index
                    .entry(segment.slice(sequence).to_vec())
                    .or_default()
                    .push(id);
            }
        }

        let index_duration = start.elapsed();
        info!(
            entries = corpus.len(),
            lengths = groups.len(),
            elapsed = ?index_duration,
            "PassJoin index built"
        );

        Self {
            corpus,
            params,
            groups,
            index_duration,
        }
    }
}

/// Query positions at which segment `index` of an entry of length `entry_len` can be found.
fn substring_range(
    query_len: usize,
    segment: Segment,
    index: usize,
    entry_len: usize,
    threshold: usize,
) -> Option<(usize, usize)> {
    let pos = segment.start as isize;
    let index = index as isize;
    let remaining = threshold as isize - index;
    let delta = query_len as isize - entry_len as isize;

    let start = 0isize.max(pos - index).max(pos + delta - remaining);
    let end = (query_len as isize - segment.len as isize)
        .min(pos + index)
        .min(pos + delta + remaining);

    (start <= end).then(|| (start as usize, end as usize))
}

impl SimilaritySearch for PassJoinSearch<'_> {
    #[inline]
    fn corpus(&self) -> &Corpus {
        self.corpus
    }

    #[inline]
    fn ranking(&self) -> Ranking {
        Ranking::Ascending
    }

    #[inline]
    fn index_duration(&self) -> Option<Duration> {
        Some(self.index_duration)
    }

    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        let &JoinParams { threshold, filter } = &self.params;

        let mut checked = vec![false; self.corpus.len()];
        let mut results = Vec::new();
        let mut candidates = 0usize;

        let lengths = query.len().saturating_sub(threshold)..=query.len() + threshold;
        for (&entry_len, group) in self.groups.range(lengths) {
            for (index, (&segment, segment_index)) in
                group.segments.iter().zip(&group.indices).enumerate()
            {
                let Some((start, end)) =
                    substring_range(query.len(), segment, index, entry_len, threshold)
                else {
                    continue;
                };

                for query_pos in start..=end {
                    let substring = &query[query_pos..query_pos + segment.len];
                    let Some(ids) = segment_index.get(substring) else {
                        continue;
                    };

                    for &id in ids {
                        if checked[id.index()] {
                            continue;
                        }

                        let entry = self.corpus.entry(id);
                        let candidate = Candidate {
                            source: entry.sequence(),
                            boxes: &group.segments,
                            matched: index,
                            target: query,
                        };
                        checked[id.index()] = true;
                        if filter.accepts(candidate, threshold).not() {
                            continue;
                        }

                        candidates += 1;
                        let distance =
                            length_aware_edit_distance(query, entry.sequence(), threshold);
                        if distance <= threshold {
                            results.push(SearchResult::new(id, entry, distance as f64, true));
                        }
                    }
                }
            }
        }

        debug!(
            query_len = query.len(),
            candidates,
            results = results.len(),
            "PassJoin search completed"
        );
        results
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;
    use crate::{alphabet::seq, distance::levenshtein, pigeonring::ChainBound};

    pub(crate) fn mutate(rng: &mut SmallRng, sequence: &[Symbol], edits: usize) -> Vec<Symbol> {
        let mut sequence = sequence.to_vec();
        for _ in 0..edits {
            let symbol = Symbol::from_index(rng.gen_range(0..4)).unwrap();
            match rng.gen_range(0..3) {
                0 if sequence.is_empty().not() => {
                    let pos = rng.gen_range(0..sequence.len());
                    sequence[pos] = symbol;
                }
                1 if sequence.is_empty().not() => {
                    sequence.remove(rng.gen_range(0..sequence.len()));
                }
                _ => sequence.insert(rng.gen_range(0..=sequence.len()), symbol),
            }
        }
        sequence
    }

    pub(crate) fn near_duplicates(rng: &mut SmallRng) -> Corpus {
        let bases = (0..6)
            .map(|_| {
                let len = rng.gen_range(1..14);
                (0..len)
                    .map(|_| Symbol::from_index(rng.gen_range(0..4)).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let entries = (0..40)
            .map(|index| {
                let base = &bases[index % bases.len()];
                let edits = rng.gen_range(0..4);
                crate::corpus::Entry::new(format!("e{index}"), mutate(rng, base, edits))
            })
            .collect();
        Corpus::new(entries)
    }

    pub(crate) fn brute_force(
        corpus: &Corpus,
        query: &[Symbol],
        threshold: usize,
    ) -> Vec<(String, f64)> {
        let mut expected = corpus
            .iter()
            .filter_map(|(id, entry)| {
                let distance = levenshtein(query, entry.sequence());
                (distance <= threshold).then(|| (id, entry.id.clone(), distance))
            })
            .collect::<Vec<_>>();
        expected.sort_by_key(|&(id, _, distance)| (distance, id));
        expected
            .into_iter()
            .map(|(_, name, distance)| (name, distance as f64))
            .collect()
    }

    pub(crate) fn summary(results: &[SearchResult]) -> Vec<(String, f64)> {
        results
            .iter()
            .map(|result| (result.id.clone(), result.score))
            .collect()
    }

    #[test]
    fn partition_lengths() {
        let lengths = |len, parts| {
            partition(len, parts)
                .into_iter()
                .map(|segment| segment.len)
                .collect::<Vec<_>>()
        };

        assert_eq!(lengths(4, 2), [2, 2]);
        assert_eq!(lengths(7, 3), [2, 2, 3]);
        assert_eq!(lengths(8, 3), [2, 3, 3]);
        assert_eq!(lengths(2, 3), [0, 1, 1]);

        let segments = partition(8, 3);
        assert_eq!(segments[2], Segment { start: 5, len: 3 });
    }

    #[test]
    fn substring_ranges() {
        let segment = Segment { start: 2, len: 2 };
        // same length, second segment, threshold 1
        assert_eq!(substring_range(4, segment, 1, 4, 1), Some((2, 2)));
        // query one symbol longer
        assert_eq!(substring_range(5, segment, 1, 4, 1), Some((3, 3)));
        // query one symbol shorter
        assert_eq!(substring_range(3, segment, 1, 4, 1), Some((1, 1)));
        assert_eq!(substring_range(1, segment, 1, 4, 1), None);
    }

    #[test]
    fn rejects_long_chains() {
        let filter = FilterPolicy::Pigeonring {
            chain_length: 3,
            bound: ChainBound::EditDistance,
        };
        assert!(JoinParams::new(1, filter).is_err());
        assert!(JoinParams::new(2, filter).is_ok());
    }

    #[test]
    fn scenario() {
        let corpus = Corpus::from_pairs([("s1", "ABAC"), ("s2", "ABAD"), ("s3", "ZZZZ")]).unwrap();
        let params = JoinParams::new(1, FilterPolicy::default()).unwrap();
        let search = PassJoinSearch::new(&corpus, params);

        let results = search.search("ABAC").unwrap();
        assert_eq!(
            summary(&results),
            [("s1".to_string(), 0.), ("s2".to_string(), 1.)]
        );
        assert!(results.iter().all(|result| result.significant));
        assert!(search.index_duration().is_some());
    }

    #[test]
    fn empty_result_when_nothing_is_close() {
        let corpus = Corpus::from_pairs([("s1", "ABAC"), ("s2", "ABAD")]).unwrap();
        let params = JoinParams::new(1, FilterPolicy::None).unwrap();
        let search = PassJoinSearch::new(&corpus, params);
        assert!(search.search("zzzzzzz").unwrap().is_empty());
    }

    #[test]
    fn complete_and_exact_without_filter() {
        let mut rng = SmallRng::seed_from_u64(11);
        for threshold in 0..=3 {
            for filter in [
                FilterPolicy::None,
                FilterPolicy::Alignment {
                    bound: ChainBound::EditDistance,
                },
                FilterPolicy::Alignment {
                    bound: ChainBound::Hamming,
                },
            ] {
                let corpus = near_duplicates(&mut rng);
                let search =
                    PassJoinSearch::new(&corpus, JoinParams::new(threshold, filter).unwrap());

                for _ in 0..10 {
                    let base = corpus.entry(EntryId(rng.gen_range(0..corpus.len())));
                    let edits = rng.gen_range(0..=threshold);
                    let query = mutate(&mut rng, base.sequence(), edits);

                    assert_eq!(
                        summary(&search.search_sequence(&query)),
                        brute_force(&corpus, &query, threshold),
                        "threshold {threshold}, filter {filter:?}",
                    );
                }
            }
        }
    }

    #[test]
    fn complete_with_pigeonring_chains() {
        let mut rng = SmallRng::seed_from_u64(5);
        for threshold in 1..=3 {
            for chain_length in 2..=threshold + 1 {
                let filter = FilterPolicy::Pigeonring {
                    chain_length,
                    bound: ChainBound::EditDistance,
                };
                let corpus = near_duplicates(&mut rng);
                let search =
                    PassJoinSearch::new(&corpus, JoinParams::new(threshold, filter).unwrap());

                for _ in 0..20 {
                    let base = corpus.entry(EntryId(rng.gen_range(0..corpus.len())));
                    let edits = rng.gen_range(0..=threshold);
                    let query = mutate(&mut rng, base.sequence(), edits);
                    assert_eq!(
                        summary(&search.search_sequence(&query)),
                        brute_force(&corpus, &query, threshold),
                        "threshold {threshold}, chain length {chain_length}",
                    );
                }
            }
        }
    }

    #[test]
    fn default_parameters_are_complete() {
        let mut rng = SmallRng::seed_from_u64(31);
        let params = JoinParams::default();
        for _ in 0..10 {
            let corpus = near_duplicates(&mut rng);
            let search = PassJoinSearch::new(&corpus, params);

            for (_, entry) in corpus.iter() {
                let query = mutate(&mut rng, entry.sequence(), params.threshold);
                assert_eq!(
                    summary(&search.search_sequence(&query)),
                    brute_force(&corpus, &query, params.threshold),
                );
            }
        }
    }

    #[test]
    fn repeated_searches_are_identical() {
        let corpus =
            Corpus::from_pairs([("s1", "ABACAB"), ("s2", "ABADAB"), ("s3", "ABACAA")]).unwrap();
        let search = PassJoinSearch::new(&corpus, JoinParams::default());
        let query = seq("ABACAB");
        assert_eq!(search.search_sequence(&query), search.search_sequence(&query));
    }
}
