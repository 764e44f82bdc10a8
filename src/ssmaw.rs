use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    alphabet::Symbol,
    corpus::{Corpus, EntryId},
    engine::SimilaritySearch,
    maw::minimal_absent_words,
    search_result::{Ranking, SearchResult},
    trie::Trie,
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MawParams {
    /// Minimum length of the indexed absent words.
    pub min_len: usize,

    /// Maximum length of the indexed absent words.
    pub max_len: usize,

    /// Maximum number of reported results, 0 means all of them.
    pub max_results: usize,
}

impl MawParams {
    pub fn validate(self) -> Result<Self, Error> {
        if self.min_len < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "minimal absent words are at least 2 symbols long (got minimum length {})",
                self.min_len
            )));
        }

        if self.min_len > self.max_len {
            return Err(Error::InvalidConfiguration(format!(
                "minimum absent word length ({}) is greater than the maximum ({})",
                self.min_len, self.max_len
            )));
        }

        Ok(self)
    }
}

impl Default for MawParams {
    fn default() -> Self {
        Self {
            min_len: 4,
            max_len: 8,
            max_results: 0,
        }
    }
}

/// Jaccard distance between two sets given their sizes and the size of their intersection.
/// Two empty sets are identical.
pub fn jaccard_distance(entry_len: usize, query_len: usize, intersection: usize) -> f64 {
    let union = entry_len + query_len - intersection;
    if union == 0 {
        0.
    } else {
        1. - intersection as f64 / union as f64
    }
}

/// Similarity through shared minimal absent words.
///
/// The absent words of every entry are stored in a trie, together with the size of each set;
/// queries are scored with the Jaccard distance between the two sets.
#[derive(Debug)]
pub struct MawSearch<'a> {
    corpus: &'a Corpus,
    params: MawParams,
    trie: Trie,
    set_sizes: Vec<usize>,
    index_duration: Duration,
}

impl<'a> MawSearch<'a> {
    pub fn new(corpus: &'a Corpus, params: MawParams) -> Result<Self, Error> {
        let params = params.validate()?;
        let start = Instant::now();

        let sets = corpus
            .entries()
            .par_iter()
            .map(|entry| minimal_absent_words(entry.sequence(), params.min_len, params.max_len))
            .collect::<Vec<_>>();

        let mut trie = Trie::new();
        let set_sizes = sets
            .into_iter()
            .enumerate()
            .map(|(position, words)| {
                for word in &words {
                    trie.insert(word, EntryId(position));
                }
                words.len()
            })
            .collect::<Vec<_>>();

        let index_duration = start.elapsed();
        info!(
            entries = corpus.len(),
            words = set_sizes.iter().sum::<usize>(),
            nodes = trie.node_count(),
            elapsed = ?index_duration,
            "minimal absent word index built"
        );

        Ok(Self {
            corpus,
            params,
            trie,
            set_sizes,
            index_duration,
        })
    }

    /// Number of absent words indexed for an entry.
    #[inline]
    pub fn set_size(&self, entry: EntryId) -> usize {
        self.set_sizes[entry.index()]
    }
}

impl SimilaritySearch for MawSearch<'_> {
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

    #[inline]
    fn result_limit(&self) -> Option<usize> {
        (self.params.max_results > 0).then_some(self.params.max_results)
    }

    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        let &MawParams {
            min_len, max_len, ..
        } = &self.params;

        let query_words = minimal_absent_words(query, min_len, max_len);
        let mut shared = vec![0usize; self.corpus.len()];
        for word in &query_words {
            for &entry in self.trie.get(word) {
                shared[entry.index()] += 1;
            }
        }
        debug!(
            query_len = query.len(),
            words = query_words.len(),
            "query absent words collected"
        );

        self.corpus
            .iter()
            .zip(shared)
            .map(|((id, entry), intersection)| {
                let distance =
                    jaccard_distance(self.set_size(id), query_words.len(), intersection);
                SearchResult::new(id, entry, distance, true)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::alphabet::seq;

    fn corpus() -> Corpus {
        Corpus::from_pairs([
            ("s1", "ABACABAD"),
            ("s2", "ABACABAE"),
            ("s3", "ZZZZzzzz"),
            ("s4", "ABAB"),
        ])
        .unwrap()
    }

    #[test]
    fn invalid_parameters() {
        let corpus = corpus();
        for (min_len, max_len) in [(1, 10), (0, 0), (5, 4)] {
            let params = MawParams {
                min_len,
                max_len,
                ..Default::default()
            };
            assert!(MawSearch::new(&corpus, params).is_err());
        }
    }

    #[test]
    fn jaccard() {
        assert_abs_diff_eq!(jaccard_distance(0, 0, 0), 0.);
        assert_abs_diff_eq!(jaccard_distance(4, 4, 4), 0.);
        assert_abs_diff_eq!(jaccard_distance(3, 2, 0), 1.);
        assert_abs_diff_eq!(jaccard_distance(4, 2, 1), 0.8);
    }

    #[test]
    fn set_sizes_match_absent_words() {
        let corpus = corpus();
        let params = MawParams {
            min_len: 2,
            max_len: 10,
            ..Default::default()
        };
        let search = MawSearch::new(&corpus, params).unwrap();

        // AA, BB, BABA
        assert_eq!(search.set_size(EntryId(3)), 3);
        for (id, entry) in corpus.iter() {
            assert_eq!(
                search.set_size(id),
                minimal_absent_words(entry.sequence(), 2, 10).len()
            );
        }
        assert!(search.index_duration().is_some());
    }

    #[test]
    fn self_distance_is_zero() {
        let corpus = corpus();
        let search = MawSearch::new(&corpus, MawParams::default()).unwrap();

        for (id, entry) in corpus.iter() {
            let results = search.search_by_id(&entry.id).unwrap();
            let own = results.iter().find(|result| result.entry == id).unwrap();
            assert_abs_diff_eq!(own.score, 0.);
            assert!(results.iter().all(|result| result.significant));
        }
    }

    #[test]
    fn ranks_closest_entry_first() {
        let corpus = corpus();
        let search = MawSearch::new(&corpus, MawParams::default()).unwrap();
        let results = search.search("ABACABAD").unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].id, "s1");
        assert_abs_diff_eq!(results[0].score, 0.);
        assert!(results
            .windows(2)
            .all(|pair| pair[0].score <= pair[1].score));

        let s2 = results.iter().find(|result| result.id == "s2").unwrap();
        let s3 = results.iter().find(|result| result.id == "s3").unwrap();
        assert!(s2.score < s3.score);
    }

    #[test]
    fn results_are_truncated() {
        let corpus = corpus();
        let params = MawParams {
            max_results: 2,
            ..Default::default()
        };
        let search = MawSearch::new(&corpus, params).unwrap();
        assert_eq!(search.result_limit(), Some(2));

        let results = search.search_sequence(&seq("ABACABAD"));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "s1");
    }

    #[test]
    fn repeated_queries_are_identical() {
        let corpus = corpus();
        let search = MawSearch::new(&corpus, MawParams::default()).unwrap();
        assert_eq!(
            search.search("ABAB").unwrap(),
            search.search("ABAB").unwrap()
        );
    }
}
