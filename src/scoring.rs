use ndarray::Array2;

use crate::alphabet::{Symbol, ALPHABET_LEN};

/// Similarity of two intervals, based on their distance modulo an octave of seven steps.
#[inline]
pub fn interval_score(a: Symbol, b: Symbol) -> i32 {
    match (a.interval() - b.interval()).abs() % 7 {
        0 => 1,
        1 | 6 => 0,
        2 | 5 => -1,
        _ => -2,
    }
}

#[inline]
pub fn clamp(score: i32) -> i32 {
    score.max(0)
}

/// Dense lookup table of [`interval_score`] indexed by symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionMatrix(Array2<i32>);

impl SubstitutionMatrix {
    pub fn new() -> Self {
        let mut matrix = Array2::zeros((ALPHABET_LEN, ALPHABET_LEN));
        for a in Symbol::all() {
            for b in Symbol::all() {
                matrix[(a.index(), b.index())] = interval_score(a, b);
            }
        }

        Self(matrix)
    }

    #[inline]
    pub fn score(&self, a: Symbol, b: Symbol) -> i32 {
        self.0[(a.index(), b.index())]
    }
}

impl Default for SubstitutionMatrix {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
