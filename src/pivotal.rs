use std::{
    collections::BTreeMap,
    ops::{Not, RangeInclusive},
    time::{Duration, Instant},
};

use fnv::FnvHashMap;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::{
    alphabet::Symbol,
    corpus::{Corpus, EntryId},
    distance::length_aware_edit_distance,
    engine::SimilaritySearch,
    pass_join::JoinParams,
    pigeonring::{Candidate, FilterPolicy, Segment},
    search_result::{Ranking, SearchResult},
    Error,
};

type Gram = SmallVec<[Symbol; 8]>;

/// Global order of q-grams: rarest first, ties broken by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    frequency: usize,
    gram: Gram,
}

#[derive(Debug, Clone, Copy)]
struct Qgram<'s> {
    frequency: usize,
    gram: &'s [Symbol],
    pos: usize,
}

impl<'s> Qgram<'s> {
    #[inline]
    fn key(&self) -> (usize, &'s [Symbol]) {
        (self.frequency, self.gram)
    }

    #[inline]
    fn segment(&self) -> Segment {
        Segment {
            start: self.pos,
            len: self.gram.len(),
        }
    }
}

#[derive(Debug)]
struct Selection<'s> {
    prefix: Vec<Qgram<'s>>,
    pivotal: Vec<Qgram<'s>>,
    last: Option<OrderKey>,
}

#[derive(Debug, Clone, Copy)]
struct PrefixRecord {
    entry: EntryId,
    pos: usize,
}

#[derive(Debug, Clone, Copy)]
struct PivotalRecord {
    entry: EntryId,
    pos: usize,
    ordinal: usize,
}

#[derive(Debug, Default)]
struct IndexedEntry {
    last: Option<OrderKey>,
    pivotal: Vec<Segment>,
}

type GramIndex<R> = BTreeMap<usize, FnvHashMap<Gram, Vec<R>>>;

/// Threshold search through pivotal prefix filtering.
///
/// The q-grams of every string are ordered by corpus frequency; the first `q * threshold + 1`
/// form the prefix, and up to `threshold + 1` disjoint prefix grams are the pivotal ones. Two
/// strings within the threshold share a pivotal gram of one with the prefix of the other,
/// depending on which of the two has the greater last prefix gram.
#[derive(Debug)]
pub struct PivotalSearch<'a> {
    corpus: &'a Corpus,
    params: JoinParams,
    q: usize,
    frequencies: FnvHashMap<Gram, usize>,
    prefixes: GramIndex<PrefixRecord>,
    pivotals: GramIndex<PivotalRecord>,
    entries: Vec<IndexedEntry>,
    short: BTreeMap<usize, Vec<EntryId>>,
    by_length: BTreeMap<usize, Vec<EntryId>>,
    index_duration: Duration,
}

impl<'a> PivotalSearch<'a> {
    pub fn new(corpus: &'a Corpus, params: JoinParams, q: usize) -> Result<Self, Error> {
        if q == 0 {
            return Err(Error::InvalidConfiguration(
                "q-gram length must be greater than zero".to_string(),
            ));
        }

        let start = Instant::now();
        let mut frequencies = FnvHashMap::<Gram, usize>::default();
        for entry in corpus.entries() {
            for gram in entry.sequence().windows(q) {
                *frequencies.entry(Gram::from_slice(gram)).or_default() += 1;
            }
        }

        let mut search = Self {
            corpus,
            params,
            q,
            frequencies,
            prefixes: GramIndex::default(),
            pivotals: GramIndex::default(),
            entries: Vec::with_capacity(corpus.len()),
            short: BTreeMap::new(),
            by_length: BTreeMap::new(),
            index_duration: Duration::default(),
        };

        for (id, entry) in corpus.iter() {
            let len = entry.len();
            search.by_length.entry(len).or_default().push(id);

            let selection = search.select(entry.sequence());
            if search.is_short(&selection) {
                search.short.entry(len).or_default().push(id);
                search.entries.push(IndexedEntry::default());
                continue;
            }

            let prefixes = search.prefixes.entry(len).or_default();
            for gram in &selection.prefix {
                prefixes
                    .entry(Gram::from_slice(gram.gram))
                    .or_default()
                    .push(PrefixRecord {
                        entry: id,
                        pos: gram.pos,
                    });
            }

            let pivotals = search.pivotals.entry(len).or_default();
            for (ordinal, gram) in selection.pivotal.iter().enumerate() {
                pivotals
                    .entry(Gram::from_slice(gram.gram))
                    .or_default()
                    .push(PivotalRecord {
                        entry: id,
                        pos: gram.pos,
                        ordinal,
                    });
            }

            search.entries.push(IndexedEntry {
                last: selection.last,
                pivotal: selection.pivotal.iter().map(Qgram::segment).collect(),
            });
        }

        search.index_duration = start.elapsed();
        info!(
            entries = corpus.len(),
            grams = search.frequencies.len(),
            short = search.short.values().map(Vec::len).sum::<usize>(),
            elapsed = ?search.index_duration,
            "pivotal index built"
        );

        Ok(search)
    }

    fn select<'s>(&self, sequence: &'s [Symbol]) -> Selection<'s> {
        let mut grams = sequence
            .windows(self.q)
            .enumerate()
            .map(|(pos, gram)| Qgram {
                frequency: self.frequencies.get(gram).copied().unwrap_or(0),
                gram,
                pos,
            })
            .collect::<Vec<_>>();

        if grams.is_empty() {
            return Selection {
                prefix: grams,
                pivotal: Vec::new(),
                last: None,
            };
        }

        grams.sort_unstable_by(|a, b| a.key().cmp(&b.key()).then(a.pos.cmp(&b.pos)));

        // Grams equal to the last prefix gram are kept as well, so that the prefix contains every
        // occurrence of the grams not greater than the last one.
        let mut prefix_len = (self.q * self.params.threshold + 1).min(grams.len());
        let (frequency, gram) = grams[prefix_len - 1].key();
        while grams
            .get(prefix_len)
            .map_or(false, |next| next.key() == (frequency, gram))
        {
            prefix_len += 1;
        }
        let last = OrderKey {
            frequency,
            gram: Gram::from_slice(gram),
        };

        grams.truncate(prefix_len);
        grams.sort_unstable_by_key(|gram| gram.pos);

        let max_pivotals = self.params.threshold + 1;
        let mut pivotal = Vec::with_capacity(max_pivotals);
        let mut next_free = 0;
        for gram in &grams {
            if gram.pos < next_free {
                continue;
            }

            pivotal.push(*gram);
            next_free = gram.pos + self.q;
            if pivotal.len() == max_pivotals {
                break;
            }
        }

        Selection {
            prefix: grams,
            pivotal,
            last: Some(last),
        }
    }

    /// Strings without enough disjoint grams cannot be found through the index.
    #[inline]
    fn is_short(&self, selection: &Selection<'_>) -> bool {
        selection.pivotal.len() < self.params.threshold + 1
    }

    fn length_range(&self, query: &[Symbol]) -> RangeInclusive<usize> {
        let threshold = self.params.threshold;
        query.len().saturating_sub(threshold)..=query.len() + threshold
    }
}

struct Verifier<'a, 'q> {
    corpus: &'a Corpus,
    query: &'q [Symbol],
    threshold: usize,
    checked: Vec<bool>,
    results: Vec<SearchResult>,
    candidates: usize,
}

impl Verifier<'_, '_> {
    #[inline]
    fn is_checked(&self, id: EntryId) -> bool {
        self.checked[id.index()]
    }

    fn verify(&mut self, id: EntryId) {
        self.checked[id.index()] = true;
        self.candidates += 1;

        let entry = self.corpus.entry(id);
        let distance = length_aware_edit_distance(self.query, entry.sequence(), self.threshold);
        if distance <= self.threshold {
            self.results
                .push(SearchResult::new(id, entry, distance as f64, true));
        }
    }
}

impl SimilaritySearch for PivotalSearch<'_> {
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
        let lengths = self.length_range(query);
        let mut verifier = Verifier {
            corpus: self.corpus,
            query,
            threshold,
            checked: vec![false; self.corpus.len()],
            results: Vec::new(),
            candidates: 0,
        };

        let selection = self.select(query);
        if self.is_short(&selection) {
            self.by_length
                .range(lengths)
                .flat_map(|(_, ids)| ids)
                .for_each(|&id| verifier.verify(id));
        } else {
            let query_last = selection.last.as_ref();
            let query_pivotal = selection
                .pivotal
                .iter()
                .map(Qgram::segment)
                .collect::<Vec<_>>();

            // The query prefix against the pivotal grams of entries with a smaller last prefix gram
            for gram in &selection.prefix {
                for records in self
                    .pivotals
                    .range(lengths.clone())
                    .filter_map(|(_, index)| index.get(gram.gram))
                {
                    for record in records {
                        let indexed = &self.entries[record.entry.index()];
                        if verifier.is_checked(record.entry)
                            || query_last <= indexed.last.as_ref()
                            || record.pos.abs_diff(gram.pos) > threshold
                        {
                            continue;
                        }

                        let candidate = Candidate {
                            source: self.corpus.entry(record.entry).sequence(),
                            boxes: &indexed.pivotal,
                            matched: record.ordinal,
                            target: query,
                        };
                        if filter.accepts(candidate, threshold) {
                            verifier.verify(record.entry);
                        }
                    }
                }
            }

            // The query pivotal grams against the prefixes of the other entries
            for (ordinal, gram) in selection.pivotal.iter().enumerate() {
                for records in self
                    .prefixes
                    .range(lengths.clone())
                    .filter_map(|(_, index)| index.get(gram.gram))
                {
                    for record in records {
                        let indexed = &self.entries[record.entry.index()];
                        if verifier.is_checked(record.entry)
                            || query_last > indexed.last.as_ref()
                            || record.pos.abs_diff(gram.pos) > threshold
                        {
                            continue;
                        }

                        let candidate = Candidate {
                            source: query,
                            boxes: &query_pivotal,
                            matched: ordinal,
                            target: self.corpus.entry(record.entry).sequence(),
                        };
                        if filter.accepts(candidate, threshold) {
                            verifier.verify(record.entry);
                        }
                    }
                }
            }

            for &id in self.short.range(lengths).flat_map(|(_, ids)| ids) {
                if verifier.is_checked(id).not() {
                    verifier.verify(id);
                }
            }
        }

        debug!(
            query_len = query.len(),
            candidates = verifier.candidates,
            results = verifier.results.len(),
            "pivotal search completed"
        );
        verifier.results
    }
}
