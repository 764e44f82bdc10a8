use ndarray::Array2;
use rayon::prelude::*;

use crate::{
    alphabet::Symbol,
    corpus::{Corpus, EntryId},
    distance::levenshtein,
    engine::SimilaritySearch,
    scoring::{clamp, SubstitutionMatrix},
    search_result::{Ranking, SearchResult},
    Error,
};

const MINUS_INFINITY: i32 = i32::MIN / 4;

/// Affine gap costs, both expressed as positive penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapCosts {
    pub open: i32,
    pub extend: i32,
}

impl GapCosts {
    pub fn new(open: i32, extend: i32) -> Result<Self, Error> {
        if open < 0 || extend < 0 {
            return Err(Error::InvalidConfiguration(format!(
                "gap costs must not be negative (open: {open}, extend: {extend})"
            )));
        }

        Ok(Self { open, extend })
    }

    /// Cost of a gap spanning `len` symbols.
    #[inline]
    pub fn gap(&self, len: usize) -> i32 {
        match len {
            0 => 0,
            _ => self.open + (len as i32 - 1) * self.extend,
        }
    }
}

impl Default for GapCosts {
    fn default() -> Self {
        Self { open: 2, extend: 1 }
    }
}

/// Score matrices for affine-gap alignments, keeping only two rows at a time.
#[derive(Debug)]
struct GotohRows {
    best: Array2<i32>,
    gap_candidate: Array2<i32>,
    gap_query: Array2<i32>,
}

impl GotohRows {
    fn new(query_len: usize) -> Self {
        Self {
            best: Array2::zeros((2, query_len + 1)),
            gap_candidate: Array2::from_elem((2, query_len + 1), MINUS_INFINITY),
            gap_query: Array2::from_elem((2, query_len + 1), MINUS_INFINITY),
        }
    }

    /// Fills the row `cur` from the row `prev` and returns the maximum value in the row.
    fn fill_row<F>(
        &mut self,
        (prev, cur): (usize, usize),
        candidate_symbol: Symbol,
        query: &[Symbol],
        matrix: &SubstitutionMatrix,
        gaps: GapCosts,
        mut map_cell: F,
    ) -> i32
    where
        F: FnMut(i32) -> i32,
    {
        let mut row_max = self.best[(cur, 0)];
        for (j, &query_symbol) in query.iter().enumerate() {
            let j = j + 1;
            let diagonal = self.best[(prev, j - 1)] + matrix.score(candidate_symbol, query_symbol);

            let best = map_cell(
                diagonal
                    .max(self.gap_candidate[(prev, j)])
                    .max(self.gap_query[(cur, j - 1)]),
            );
            self.best[(cur, j)] = best;
            self.gap_candidate[(cur, j)] =
                map_cell((diagonal - gaps.open).max(self.gap_candidate[(prev, j)] - gaps.extend));
            self.gap_query[(cur, j)] =
                map_cell((diagonal - gaps.open).max(self.gap_query[(cur, j - 1)] - gaps.extend));

            row_max = row_max.max(best);
        }

        row_max
    }
}

/// Global alignment score with affine gaps (Gotoh).
pub fn global_alignment_score(
    query: &[Symbol],
    candidate: &[Symbol],
    matrix: &SubstitutionMatrix,
    gaps: GapCosts,
) -> i32 {
    if query.is_empty() || candidate.is_empty() {
        return -gaps.gap(query.len().max(candidate.len()));
    }

    let mut rows = GotohRows::new(query.len());
    for j in 1..=query.len() {
        rows.best[(0, j)] = -gaps.gap(j);
    }

    for (i, &candidate_symbol) in candidate.iter().enumerate() {
        let (prev, cur) = (i % 2, (i + 1) % 2);
        rows.best[(cur, 0)] = -gaps.gap(i + 1);
        rows.gap_candidate[(cur, 0)] = MINUS_INFINITY;
        rows.gap_query[(cur, 0)] = MINUS_INFINITY;
        rows.fill_row(
            (prev, cur),
            candidate_symbol,
            query,
            matrix,
            gaps,
            |score| score,
        );
    }

    rows.best[(candidate.len() % 2, query.len())]
}

/// Local alignment score with affine gaps (Smith-Waterman with Gotoh gaps).
pub fn local_alignment_score(
    query: &[Symbol],
    candidate: &[Symbol],
    matrix: &SubstitutionMatrix,
    gaps: GapCosts,
) -> i32 {
    if query.is_empty() || candidate.is_empty() {
        return 0;
    }

    let mut rows = GotohRows::new(query.len());
    let mut best = 0;
    for (i, &candidate_symbol) in candidate.iter().enumerate() {
        let (prev, cur) = (i % 2, (i + 1) % 2);
        rows.best[(cur, 0)] = 0;
        rows.gap_candidate[(cur, 0)] = MINUS_INFINITY;
        rows.gap_query[(cur, 0)] = MINUS_INFINITY;
        let row_max = rows.fill_row((prev, cur), candidate_symbol, query, matrix, gaps, clamp);
        best = best.max(row_max);
    }

    best
}

fn scan_corpus<F>(corpus: &Corpus, score: F) -> Vec<SearchResult>
where
    F: Fn(&[Symbol]) -> f64 + Sync,
{
    corpus
        .entries()
        .par_iter()
        .enumerate()
        .map(|(index, entry)| {
            SearchResult::new(EntryId(index), entry, score(entry.sequence()), true)
        })
        .collect()
}

/// Exhaustive search ranking every entry by its edit distance from the query.
#[derive(Debug)]
pub struct EditDistanceSearch<'a> {
    corpus: &'a Corpus,
}

impl<'a> EditDistanceSearch<'a> {
    #[inline]
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }
}

impl SimilaritySearch for EditDistanceSearch<'_> {
    #[inline]
    fn corpus(&self) -> &Corpus {
        self.corpus
    }

    #[inline]
    fn ranking(&self) -> Ranking {
        Ranking::Ascending
    }

    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        scan_corpus(self.corpus, |entry| levenshtein(query, entry) as f64)
    }
}

#[derive(Debug)]
pub struct GlobalAlignmentSearch<'a> {
    corpus: &'a Corpus,
    matrix: SubstitutionMatrix,
    gaps: GapCosts,
}

impl<'a> GlobalAlignmentSearch<'a> {
    pub fn new(corpus: &'a Corpus, gaps: GapCosts) -> Self {
        Self {
            corpus,
            matrix: SubstitutionMatrix::new(),
            gaps,
        }
    }
}

impl SimilaritySearch for GlobalAlignmentSearch<'_> {
    #[inline]
    fn corpus(&self) -> &Corpus {
        self.corpus
    }

    #[inline]
    fn ranking(&self) -> Ranking {
        Ranking::Descending
    }

    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        scan_corpus(self.corpus, |entry| {
            global_alignment_score(query, entry, &self.matrix, self.gaps).into()
        })
    }
}

#[derive(Debug)]
pub struct LocalAlignmentSearch<'a> {
    corpus: &'a Corpus,
    matrix: SubstitutionMatrix,
    gaps: GapCosts,
}

impl<'a> LocalAlignmentSearch<'a> {
    pub fn new(corpus: &'a Corpus, gaps: GapCosts) -> Self {
        Self {
            corpus,
            matrix: SubstitutionMatrix::new(),
            gaps,
        }
    }
}

impl SimilaritySearch for LocalAlignmentSearch<'_> {
    #[inline]
    fn corpus(&self) -> &Corpus {
        self.corpus
    }

    #[inline]
    fn ranking(&self) -> Ranking {
        Ranking::Descending
    }

    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        scan_corpus(self.corpus, |entry| {
            local_alignment_score(query, entry, &self.matrix, self.gaps).into()
        })
    }
}
