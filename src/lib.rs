//! Approximate similarity search over melodic interval sequences.
//!
//! A [`Corpus`] of reference melodies is searched by one of several engines, all implementing
//! [`SimilaritySearch`]: plain edit distance, global and local affine-gap alignment, a BLAST-like
//! seed and extend heuristic, two partition-based similarity joins (PassJoin and pivotal prefix
//! filtering) and a minimal absent word comparison.

pub mod alignment;
pub mod alphabet;
pub mod blast;
pub mod cli;
pub mod corpus;
pub mod distance;
pub mod engine;
pub mod maw;
pub mod pass_join;
pub mod pigeonring;
pub mod pivotal;
pub mod scoring;
pub mod search_result;
pub mod ssmaw;
pub mod trie;

pub use alphabet::{Symbol, SymbolSet};
pub use corpus::{Corpus, Entry, EntryId};
pub use engine::{Engine, EngineKind, SimilaritySearch};
pub use search_result::{Ranking, SearchResult};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    #[error("entry {0:?} not found in corpus")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
