use std::ops::Not;

use fnv::FnvHashMap;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    alphabet::Symbol,
    corpus::{Corpus, EntryId},
    engine::SimilaritySearch,
    scoring::SubstitutionMatrix,
    search_result::{Ranking, SearchResult},
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastParams {
    /// Length of the words used as seeds.
    pub word_size: usize,

    /// Minimum score of a neighbourhood word.
    pub threshold: i32,

    /// Maximum distance between two hits on the same diagonal triggering an extension.
    pub two_hit_window: usize,

    /// Maximum drop from the best score before an extension stops.
    pub x_drop: i32,

    /// Karlin-Altschul `K` parameter.
    pub k: f64,

    /// Karlin-Altschul `lambda` parameter.
    pub lambda: f64,

    /// Extensions with a P-value below this are significant.
    pub significance: f64,
}

impl BlastParams {
    pub fn validate(self) -> Result<Self, Error> {
        if self.word_size == 0 {
            return Err(Error::InvalidConfiguration(
                "BLAST word size must be greater than zero".to_string(),
            ));
        }

        if self.x_drop < 0 {
            return Err(Error::InvalidConfiguration(format!(
                "BLAST X-drop cannot be negative (got {})",
                self.x_drop
            )));
        }

        Ok(self)
    }
}

impl Default for BlastParams {
    fn default() -> Self {
        Self {
            word_size: 4,
            threshold: 4,
            two_hit_window: 10,
            x_drop: 4,
            k: 0.272_319_295_615_372_33,
            lambda: 1.049_999_237_060_546_9,
            significance: 0.01,
        }
    }
}

/// High scoring word: a word scoring at least the threshold against the query window at
/// `query_pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsw {
    pub score: i32,
    pub query_pos: usize,
}

pub type Word = SmallVec<[Symbol; 8]>;
pub type HswIndex = FnvHashMap<Word, Vec<Hsw>>;

/// Seed and extend search: neighbourhood words of the query are looked up in every entry, and
/// pairs of close hits on the same diagonal are extended without gaps.
#[derive(Debug)]
pub struct BlastSearch<'a> {
    corpus: &'a Corpus,
    params: BlastParams,
    matrix: SubstitutionMatrix,
}

impl<'a> BlastSearch<'a> {
    pub fn new(corpus: &'a Corpus, params: BlastParams) -> Result<Self, Error> {
        Ok(Self {
            corpus,
            params: params.validate()?,
            matrix: SubstitutionMatrix::new(),
        })
    }

    /// Collects every word scoring at least the threshold against each query window.
    ///
    /// The window itself is always included, with a score equal to its length. Mutations are
    /// applied at strictly increasing positions, so each word is produced at most once per
    /// window.
    pub fn hsw_index(&self, query: &[Symbol]) -> HswIndex {
        let &BlastParams {
            word_size,
            threshold,
            ..
        } = &self.params;

        let mut index = HswIndex::default();
        let mut pending = Vec::new();
        for (query_pos, window) in query.windows(word_size).enumerate() {
            let score = word_size as i32;
            index
                .entry(Word::from_slice(window))
                .or_default()
                .push(Hsw { score, query_pos });

            pending.push((Word::from_slice(window), score, 0));
            while let Some((word, score, first_pos)) = pending.pop() {
                for pos in first_pos..word_size {
                    let original = word[pos];
                    for symbol in Symbol::all().filter(|&symbol| symbol != original) {
                        let score = score + self.matrix.score(original, symbol) - 1;
                        if score < threshold {
                            continue;
                        }

                        let mut mutated = word.clone();
                        mutated[pos] = symbol;
                        index
                            .entry(mutated.clone())
                            .or_default()
                            .push(Hsw { score, query_pos });
                        pending.push((mutated, score, pos + 1));
                    }
                }
            }
        }

        index
    }

    /// Ungapped extension of a seed in both directions, stopping when the running score drops
    /// more than X below the best one.
    fn extend(
        &self,
        query: &[Symbol],
        entry: &[Symbol],
        query_pos: usize,
        entry_pos: usize,
        seed_score: i32,
    ) -> i32 {
        let &BlastParams {
            word_size, x_drop, ..
        } = &self.params;

        let mut score = seed_score;
        let mut best = seed_score;

        let left = query[..query_pos]
            .iter()
            .rev()
            .zip(entry[..entry_pos].iter().rev());
        for (&query_symbol, &entry_symbol) in left {
            let next = score + self.matrix.score(query_symbol, entry_symbol);
            if next < best - x_drop {
                break;
            }
            score = next;
            best = best.max(score);
        }

        let right = query[query_pos + word_size..]
            .iter()
            .zip(&entry[entry_pos + word_size..]);
        for (&query_symbol, &entry_symbol) in right {
            let next = score + self.matrix.score(query_symbol, entry_symbol);
            if next < best - x_drop {
                break;
            }
            score = next;
            best = best.max(score);
        }

        score
    }

    /// Probability of an ungapped alignment scoring at least `score` by chance.
    pub fn p_value(&self, query_len: usize, score: i32) -> f64 {
        let &BlastParams { k, lambda, .. } = &self.params;
        let search_space = self.corpus.total_len() as f64 * query_len as f64;
        let expected = k * search_space * (-lambda * f64::from(score)).exp();
        1. - (-expected).exp()
    }

    fn scan_entry(
        &self,
        query: &[Symbol],
        entry: &[Symbol],
        index: &HswIndex,
        diagonals: &mut Vec<Option<usize>>,
    ) -> (i32, bool) {
        let &BlastParams {
            word_size,
            two_hit_window,
            significance,
            ..
        } = &self.params;

        diagonals.clear();
        diagonals.resize(entry.len() + query.len() + 1, None);

        let mut best = 0;
        let mut significant = false;
        for (entry_pos, word) in entry.windows(word_size).enumerate() {
            let Some(hsws) = index.get(word) else {
                continue;
            };

            for hsw in hsws {
                let diagonal = &mut diagonals[hsw.query_pos + entry.len() - entry_pos];
                let previous = *diagonal;
                if previous.map_or(false, |previous| hsw.query_pos < previous + word_size) {
                    continue;
                }

                *diagonal = Some(hsw.query_pos);
                let Some(previous) = previous else {
                    continue;
                };
                if hsw.query_pos - previous > two_hit_window {
                    continue;
                }

                let score = self.extend(query, entry, hsw.query_pos, entry_pos, hsw.score);
                if significant.not() && self.p_value(query.len(), score) < significance {
                    significant = true;
                }
                best = best.max(score);
            }
        }

        (best, significant)
    }
}

impl SimilaritySearch for BlastSearch<'_> {
    #[inline]
    fn corpus(&self) -> &Corpus {
        self.corpus
    }

    #[inline]
    fn ranking(&self) -> Ranking {
        Ranking::Descending
    }

    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        let index = self.hsw_index(query);
        debug!(
            query_len = query.len(),
            words = index.len(),
            "high scoring words generated"
        );

        self.corpus
            .entries()
            .par_iter()
            .enumerate()
            .map_init(Vec::new, |diagonals, (position, entry)| {
                let (score, significant) =
                    self.scan_entry(query, entry.sequence(), &index, diagonals);
                SearchResult::new(EntryId(position), entry, score.into(), significant)
            })
            .collect()
    }
}
