//! Candidate filters shared by the partition-based joins.
//!
//! Both joins split one of the two strings into disjoint boxes (segments or pivotal q-grams) and
//! find candidates through an exact match of one box. Before paying for a full edit distance, the
//! remaining boxes are compared against the neighbourhood of their position in the other string,
//! accumulating a lower bound of the errors they need.

use clap::ValueEnum;

use crate::{
    alphabet::Symbol,
    distance::{substring_edit_distance, substring_hamming_bound},
};

/// Lower bound used to estimate the errors needed by a single box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChainBound {
    /// Substring edit distance of the box inside its window. Exact but quadratic.
    #[default]
    EditDistance,

    /// Symbol-presence bound, cheaper and looser.
    Hamming,
}

impl ChainBound {
    #[inline]
    pub fn errors(self, window: &[Symbol], pattern: &[Symbol]) -> f64 {
        match self {
            ChainBound::EditDistance => substring_edit_distance(window, pattern) as f64,
            ChainBound::Hamming => substring_hamming_bound(window, pattern),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Every candidate goes straight to verification.
    None,

    /// Looks for a chain of consecutive boxes, wrapping around, whose accumulated errors never
    /// exceed the share of the threshold due to the boxes walked so far. Any string within the
    /// threshold has at least one such chain.
    Pigeonring {
        chain_length: usize,
        bound: ChainBound,
    },

    /// Sums the errors of all the boxes and rejects when the threshold is exceeded.
    Alignment { bound: ChainBound },
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy::Pigeonring {
            chain_length: 2,
            bound: ChainBound::EditDistance,
        }
    }
}

/// Disjoint box of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub len: usize,
}

impl Segment {
    #[inline]
    pub fn slice(self, sequence: &[Symbol]) -> &[Symbol] {
        &sequence[self.start..self.start + self.len]
    }

    /// Neighbourhood of the box in another string, extended by `threshold` on both sides.
    #[inline]
    pub fn window(self, target: &[Symbol], threshold: usize) -> &[Symbol] {
        let start = self.start.saturating_sub(threshold).min(target.len());
        let end = (self.start + self.len + threshold).min(target.len());
        &target[start..end]
    }
}

/// A candidate pair found through an exact match of box `matched` of `source`.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub source: &'a [Symbol],
    pub boxes: &'a [Segment],
    pub matched: usize,
    pub target: &'a [Symbol],
}

impl Candidate<'_> {
    #[inline]
    fn errors(&self, index: usize, bound: ChainBound, threshold: usize) -> f64 {
        let segment = self.boxes[index];
        bound.errors(
            segment.window(self.target, threshold),
            segment.slice(self.source),
        )
    }
}

impl FilterPolicy {
    /// Returns whether the candidate survives the filter.
    pub fn accepts(self, candidate: Candidate<'_>, threshold: usize) -> bool {
        let boxes = candidate.boxes.len();
        match self {
            FilterPolicy::None => true,
            FilterPolicy::Pigeonring { chain_length, .. } if chain_length == 0 || boxes == 0 => {
                true
            }
            FilterPolicy::Pigeonring {
                chain_length,
                bound,
            } => {
                let errors = (0..boxes)
                    .map(|index| candidate.errors(index, bound, threshold))
                    .collect::<Vec<_>>();
                let chain_length = chain_length.min(boxes);

                // Chains starting from the matched box are the most likely to pass
                (0..boxes)
                    .map(|offset| (candidate.matched + offset) % boxes)
                    .any(|first| {
                        let mut sum = 0.;
                        (0..chain_length).all(|step| {
                            sum += errors[(first + step) % boxes];
                            sum * boxes as f64 <= ((step + 1) * threshold) as f64
                        })
                    })
            }
            FilterPolicy::Alignment { bound } => {
                let mut errors = 0.;
                (0..boxes).all(|index| {
                    errors += candidate.errors(index, bound, threshold);
                    errors <= threshold as f64
                })
            }
        }
    }
}
