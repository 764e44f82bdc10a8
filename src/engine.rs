use std::{fmt, time::Duration};

use clap::ValueEnum;

use crate::{
    alignment::{EditDistanceSearch, GlobalAlignmentSearch, LocalAlignmentSearch},
    alphabet::{self, Symbol},
    blast::BlastSearch,
    cli::Cli,
    corpus::Corpus,
    pass_join::PassJoinSearch,
    pivotal::PivotalSearch,
    search_result::{Ranking, SearchResult},
    ssmaw::MawSearch,
    Error,
};

/// Common interface of the search engines.
///
/// Indices are built when an engine is created and never change afterwards, so queries only
/// need shared access.
pub trait SimilaritySearch: Sync {
    fn corpus(&self) -> &Corpus;

    fn ranking(&self) -> Ranking;

    /// Scores the candidate entries for a query, in no particular order.
    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult>;

    /// Time spent building the index, for the engines having one.
    fn index_duration(&self) -> Option<Duration> {
        None
    }

    /// Maximum number of results returned by a search.
    fn result_limit(&self) -> Option<usize> {
        None
    }

    fn search_sequence(&self, query: &[Symbol]) -> Vec<SearchResult> {
        let mut results = self.scan(query);
        self.ranking().sort(&mut results);
        if let Some(limit) = self.result_limit() {
            results.truncate(limit);
        }
        results
    }

    fn search(&self, query: &str) -> Result<Vec<SearchResult>, Error> {
        let query = alphabet::encode(query)?;
        Ok(self.search_sequence(&query))
    }

    /// Uses the sequence of a corpus entry as query. The entry itself is part of the results.
    fn search_by_id(&self, id: &str) -> Result<Vec<SearchResult>, Error> {
        let entry = self
            .corpus()
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(self.search_sequence(entry.sequence()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum EngineKind {
    /// Levenshtein distance against every entry
    #[value(alias = "ed")]
    EditDistance,

    /// Global alignment with affine gaps
    Global,

    /// Local alignment with affine gaps
    Local,

    /// Seed and extend with statistical significance
    Blast,

    /// Segment-based threshold search
    PassJoin,

    /// Pivotal prefix threshold search
    Pivotal,

    /// Jaccard distance of minimal absent words
    #[value(alias = "ssmaw")]
    Maw,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineKind::EditDistance => "edit distance",
            EngineKind::Global => "global alignment",
            EngineKind::Local => "local alignment",
            EngineKind::Blast => "BLAST",
            EngineKind::PassJoin => "PassJoin",
            EngineKind::Pivotal => "pivotal",
            EngineKind::Maw => "minimal absent words",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum Engine<'a> {
    EditDistance(EditDistanceSearch<'a>),
    Global(GlobalAlignmentSearch<'a>),
    Local(LocalAlignmentSearch<'a>),
    Blast(BlastSearch<'a>),
    PassJoin(PassJoinSearch<'a>),
    Pivotal(PivotalSearch<'a>),
    Maw(MawSearch<'a>),
}

macro_rules! dispatch {
    ($engine:expr, $search:ident => $body:expr) => {
        match $engine {
            Engine::EditDistance($search) => $body,
            Engine::Global($search) => $body,
            Engine::Local($search) => $body,
            Engine::Blast($search) => $body,
            Engine::PassJoin($search) => $body,
            Engine::Pivotal($search) => $body,
            Engine::Maw($search) => $body,
        }
    };
}

impl<'a> Engine<'a> {
    /// Builds the engine of the given kind, together with its index.
    pub fn new(kind: EngineKind, corpus: &'a Corpus, cli: &Cli) -> Result<Self, Error> {
        let engine = match kind {
            EngineKind::EditDistance => Engine::EditDistance(EditDistanceSearch::new(corpus)),
            EngineKind::Global => {
                Engine::Global(GlobalAlignmentSearch::new(corpus, cli.alignment_args.gaps()?))
            }
            EngineKind::Local => {
                Engine::Local(LocalAlignmentSearch::new(corpus, cli.alignment_args.gaps()?))
            }
            EngineKind::Blast => Engine::Blast(BlastSearch::new(corpus, cli.blast_args.params())?),
            EngineKind::PassJoin => {
                Engine::PassJoin(PassJoinSearch::new(corpus, cli.join_args.params()?))
            }
            EngineKind::Pivotal => Engine::Pivotal(PivotalSearch::new(
                corpus,
                cli.join_args.params()?,
                cli.join_args.qgram_len,
            )?),
            EngineKind::Maw => Engine::Maw(MawSearch::new(corpus, cli.maw_args.params())?),
        };

        Ok(engine)
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::EditDistance(_) => EngineKind::EditDistance,
            Engine::Global(_) => EngineKind::Global,
            Engine::Local(_) => EngineKind::Local,
            Engine::Blast(_) => EngineKind::Blast,
            Engine::PassJoin(_) => EngineKind::PassJoin,
            Engine::Pivotal(_) => EngineKind::Pivotal,
            Engine::Maw(_) => EngineKind::Maw,
        }
    }
}

impl SimilaritySearch for Engine<'_> {
    #[inline]
    fn corpus(&self) -> &Corpus {
        dispatch!(self, search => search.corpus())
    }

    #[inline]
    fn ranking(&self) -> Ranking {
        dispatch!(self, search => search.ranking())
    }

    #[inline]
    fn scan(&self, query: &[Symbol]) -> Vec<SearchResult> {
        dispatch!(self, search => search.scan(query))
    }

    #[inline]
    fn index_duration(&self) -> Option<Duration> {
        dispatch!(self, search => search.index_duration())
    }

    #[inline]
    fn result_limit(&self) -> Option<usize> {
        dispatch!(self, search => search.result_limit())
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Not;

    use super::*;
    use crate::cli::JoinArgs;

    const KINDS: [EngineKind; 7] = [
        EngineKind::EditDistance,
        EngineKind::Global,
        EngineKind::Local,
        EngineKind::Blast,
        EngineKind::PassJoin,
        EngineKind::Pivotal,
        EngineKind::Maw,
    ];

    fn corpus() -> Corpus {
        Corpus::from_pairs([("s1", "ABAC"), ("s2", "ABAD"), ("s3", "ZZZZ")]).unwrap()
    }

    fn tweaked_cli() -> Cli {
        let cli = Cli::dummy();
        Cli {
            join_args: JoinArgs {
                max_distance: 1,
                ..cli.join_args
            },
            ..cli
        }
    }

    #[test]
    fn builds_every_kind() {
        let corpus = corpus();
        let cli = tweaked_cli();

        for kind in KINDS {
            let engine = Engine::new(kind, &corpus, &cli).unwrap();
            assert_eq!(engine.kind(), kind);
            assert!(std::ptr::eq(engine.corpus(), &corpus));

            let has_index = matches!(
                kind,
                EngineKind::PassJoin | EngineKind::Pivotal | EngineKind::Maw
            );
            assert_eq!(engine.index_duration().is_some(), has_index);
        }
    }

    #[test]
    fn rankings() {
        let corpus = corpus();
        let cli = tweaked_cli();

        for kind in KINDS {
            let engine = Engine::new(kind, &corpus, &cli).unwrap();
            let expected = match kind {
                EngineKind::Global | EngineKind::Local | EngineKind::Blast => Ranking::Descending,
                _ => Ranking::Ascending,
            };
            assert_eq!(engine.ranking(), expected, "{kind}");
        }
    }

    #[test]
    fn closest_entry_comes_first() {
        let corpus = corpus();
        let cli = tweaked_cli();

        for kind in KINDS {
            if kind == EngineKind::Blast {
                continue;
            }

            let engine = Engine::new(kind, &corpus, &cli).unwrap();
            let results = engine.search("ABAC").unwrap();
            assert_eq!(results[0].id, "s1", "{kind}");
        }
    }

    #[test]
    fn threshold_engines_return_matches_only() {
        let corpus = corpus();
        let cli = tweaked_cli();

        for kind in [EngineKind::PassJoin, EngineKind::Pivotal] {
            let engine = Engine::new(kind, &corpus, &cli).unwrap();
            let results = engine
                .search("ABAC")
                .unwrap()
                .into_iter()
                .map(|result| (result.id, result.score))
                .collect::<Vec<_>>();
            assert_eq!(
                results,
                [("s1".to_string(), 0.), ("s2".to_string(), 1.)],
                "{kind}"
            );
        }
    }

    #[test]
    fn search_by_id_uses_entry_sequence() {
        let corpus = corpus();
        let cli = tweaked_cli();
        let engine = Engine::new(EngineKind::EditDistance, &corpus, &cli).unwrap();

        assert_eq!(
            engine.search_by_id("s1").unwrap(),
            engine.search("ABAC").unwrap()
        );
        assert!(matches!(
            engine.search_by_id("missing"),
            Err(Error::NotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn invalid_query_symbol() {
        let corpus = corpus();
        let cli = tweaked_cli();
        let engine = Engine::new(EngineKind::Global, &corpus, &cli).unwrap();

        assert!(matches!(
            engine.search("AB1C"),
            Err(Error::InvalidSymbol {
                symbol: '1',
                position: 2
            })
        ));
        assert!(engine.search("").unwrap().is_empty().not());
    }

    #[test]
    fn invalid_configuration() {
        let corpus = corpus();
        let cli = Cli::dummy();
        let cli = Cli {
            join_args: JoinArgs {
                qgram_len: 0,
                ..cli.join_args
            },
            ..cli
        };

        assert!(matches!(
            Engine::new(EngineKind::Pivotal, &corpus, &cli),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(Engine::new(EngineKind::PassJoin, &corpus, &cli).is_ok());
    }
}
