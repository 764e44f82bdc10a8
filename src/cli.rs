use clap::{Args, Parser, ValueEnum};
use std::{fmt, num::ParseIntError, path::PathBuf, str::FromStr};

use crate::{
    alignment::GapCosts,
    blast::BlastParams,
    engine::EngineKind,
    pass_join::JoinParams,
    pigeonring::{ChainBound, FilterPolicy},
    ssmaw::MawParams,
    Error,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
/// Approximate similarity search over melodic interval sequences
pub struct Cli {
    /// Path to the corpus file
    ///
    /// Note: each row should contain an identifier and a sequence, separated by whitespace.
    /// Sequences use uppercase letters for ascending intervals, lowercase letters for descending
    /// ones and `-` for repeated notes
    #[arg(short, long)]
    pub corpus: PathBuf,

    /// Query sequence (can be specified multiple times)
    #[arg(short, long = "query")]
    pub queries: Vec<String>,

    /// Identifier of a corpus entry to be used as query (can be specified multiple times)
    #[arg(long = "query-id")]
    pub query_ids: Vec<String>,

    /// Search engine
    #[arg(short, long, value_enum, default_value_t = EngineKind::EditDistance)]
    pub engine: EngineKind,

    /// Number of processors to use
    ///
    /// Uses all available processors if not specified
    #[arg(long)]
    pub threads: Option<u16>,

    /// Number of results printed for each query
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Besides printing the result summary to screen, all the results are written to this CSV
    /// file
    #[arg(long)]
    pub output_table: Option<PathBuf>,

    /// Increases logging verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten, next_help_heading = "Alignment options")]
    pub alignment_args: AlignmentArgs,

    #[command(flatten, next_help_heading = "BLAST options")]
    pub blast_args: BlastArgs,

    #[command(flatten, next_help_heading = "PassJoin and pivotal options")]
    pub join_args: JoinArgs,

    #[command(flatten, next_help_heading = "Minimal absent word options")]
    pub maw_args: MawArgs,
}

#[derive(Debug, Clone, Args)]
pub struct AlignmentArgs {
    /// Penalty for opening a gap
    #[arg(long, default_value_t = 2)]
    pub gap_open: i32,

    /// Penalty for each symbol extending a gap
    #[arg(long, default_value_t = 1)]
    pub gap_extend: i32,
}

impl AlignmentArgs {
    pub fn gaps(&self) -> Result<GapCosts, Error> {
        GapCosts::new(self.gap_open, self.gap_extend)
    }
}

#[derive(Debug, Clone, Args)]
pub struct BlastArgs {
    /// Length of the words used as seeds
    #[arg(long, default_value_t = BlastParams::default().word_size)]
    pub word_size: usize,

    /// Minimum score of a query neighbourhood word
    #[arg(long, default_value_t = BlastParams::default().threshold)]
    pub word_threshold: i32,

    /// Maximum distance between two hits on the same diagonal to trigger an extension
    #[arg(long, default_value_t = BlastParams::default().two_hit_window)]
    pub two_hit_window: usize,

    /// An extension stops when its score drops this much below the best one
    #[arg(long, default_value_t = BlastParams::default().x_drop)]
    pub x_drop: i32,

    /// Karlin-Altschul K parameter
    ///
    /// Note: the default value has been estimated on a folk song corpus and it is unlikely to hold
    /// for different collections
    #[arg(long, default_value_t = BlastParams::default().k)]
    pub karlin_k: f64,

    /// Karlin-Altschul lambda parameter
    #[arg(long, default_value_t = BlastParams::default().lambda)]
    pub karlin_lambda: f64,

    /// P-value threshold to consider an extension significant
    #[arg(long, default_value_t = 0.01)]
    pub significance: f64,
}

impl BlastArgs {
    pub fn params(&self) -> BlastParams {
        BlastParams {
            word_size: self.word_size,
            threshold: self.word_threshold,
            two_hit_window: self.two_hit_window,
            x_drop: self.x_drop,
            k: self.karlin_k,
            lambda: self.karlin_lambda,
            significance: self.significance,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct JoinArgs {
    /// Maximum edit distance of a reported entry
    #[arg(long, default_value_t = 2)]
    pub max_distance: usize,

    /// Filter applied to the candidates before the edit distance is computed
    #[arg(long, value_enum, default_value_t = FilterKind::Pigeonring)]
    pub filter: FilterKind,

    /// Number of boxes walked by the pigeonring filter
    #[arg(long, default_value_t = 2)]
    pub chain_length: usize,

    /// Lower bound of the errors of a single box
    #[arg(long, value_enum, default_value_t = ChainBound::EditDistance)]
    pub chain_bound: ChainBound,

    /// Length of the q-grams used by the pivotal engine
    #[arg(long, default_value_t = 2)]
    pub qgram_len: usize,
}

impl JoinArgs {
    pub fn filter(&self) -> FilterPolicy {
        match self.filter {
            FilterKind::None => FilterPolicy::None,
            FilterKind::Pigeonring => FilterPolicy::Pigeonring {
                chain_length: self.chain_length,
                bound: self.chain_bound,
            },
            FilterKind::Alignment => FilterPolicy::Alignment {
                bound: self.chain_bound,
            },
        }
    }

    pub fn params(&self) -> Result<JoinParams, Error> {
        JoinParams::new(self.max_distance, self.filter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterKind {
    /// Verify every candidate
    None,

    /// Incremental chain of boxes
    #[value(alias = "ring")]
    Pigeonring,

    /// Sum over all the boxes
    Alignment,
}

#[derive(Debug, Clone, Args)]
pub struct MawArgs {
    /// Minimum and maximum length of the minimal absent words, as `MIN,MAX` or a single length
    #[arg(long, default_value_t = LengthRange { min: 4, max: 8 })]
    pub maw_len: LengthRange,

    /// Maximum number of results of the minimal absent word engine (0 reports all of them)
    #[arg(long, default_value_t = 0)]
    pub maw_max_results: usize,
}

impl MawArgs {
    pub fn params(&self) -> MawParams {
        MawParams {
            min_len: self.maw_len.min,
            max_len: self.maw_len.max,
            max_results: self.maw_max_results,
        }
    }
}

/// Inclusive range of word lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

impl fmt::Display for LengthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseLengthRangeError {
    #[error("invalid minimum length: {0}")]
    Min(ParseIntError),

    #[error("invalid maximum length: {0}")]
    Max(ParseIntError),
}

impl FromStr for LengthRange {
    type Err = ParseLengthRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s.split_once(',').unwrap_or((s, s));
        let min = min.trim().parse().map_err(ParseLengthRangeError::Min)?;
        let max = max.trim().parse().map_err(ParseLengthRangeError::Max)?;

        Ok(Self { min, max })
    }
}

#[cfg(test)]
impl Cli {
    pub(crate) fn dummy() -> Self {
        Self::parse_from(["test", "--corpus", "test"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::dummy();
        assert_eq!(cli.engine, EngineKind::EditDistance);
        assert!(cli.queries.is_empty());
        assert_eq!(cli.alignment_args.gaps().unwrap(), GapCosts::default());
        assert_eq!(cli.blast_args.params(), BlastParams::default());
        assert_eq!(cli.join_args.params().unwrap(), JoinParams::default());
        assert_eq!(cli.maw_args.params(), MawParams::default());
    }

    #[test]
    fn repeated_queries() {
        let cli = Cli::parse_from([
            "test", "--corpus", "c.txt", "-q", "ABC", "--query", "zz-", "--query-id", "s1", "-e",
            "pass-join", "-vv",
        ]);
        assert_eq!(cli.queries, ["ABC", "zz-"]);
        assert_eq!(cli.query_ids, ["s1"]);
        assert_eq!(cli.engine, EngineKind::PassJoin);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn engine_aliases() {
        let cli = Cli::parse_from(["test", "--corpus", "c", "--engine", "ssmaw"]);
        assert_eq!(cli.engine, EngineKind::Maw);
        let cli = Cli::parse_from(["test", "--corpus", "c", "--engine", "ed"]);
        assert_eq!(cli.engine, EngineKind::EditDistance);
    }

    #[test]
    fn filter_policies() {
        let cli = Cli::parse_from([
            "test",
            "--corpus",
            "c",
            "--filter",
            "alignment",
            "--chain-bound",
            "hamming",
        ]);
        assert_eq!(
            cli.join_args.filter(),
            FilterPolicy::Alignment {
                bound: ChainBound::Hamming
            }
        );

        let cli = Cli::parse_from(["test", "--corpus", "c", "--filter", "none"]);
        assert_eq!(cli.join_args.filter(), FilterPolicy::None);

        let cli = Cli::parse_from(["test", "--corpus", "c", "--chain-length", "4"]);
        assert!(cli.join_args.params().is_err());
    }

    #[test]
    fn parse_length_range() {
        let range = |min, max| LengthRange { min, max };
        assert_eq!("3,7".parse::<LengthRange>(), Ok(range(3, 7)));
        assert_eq!(" 2, 4".parse::<LengthRange>(), Ok(range(2, 4)));
        assert_eq!("5".parse::<LengthRange>(), Ok(range(5, 5)));
        assert!(matches!(
            "x,3".parse::<LengthRange>(),
            Err(ParseLengthRangeError::Min(_))
        ));
        assert!(matches!(
            "3,".parse::<LengthRange>(),
            Err(ParseLengthRangeError::Max(_))
        ));
        assert_eq!(range(3, 10).to_string(), "3,10");

        let cli = Cli::parse_from(["test", "--corpus", "c", "--maw-len", "2,5"]);
        assert_eq!(cli.maw_args.params().min_len, 2);
        assert_eq!(cli.maw_args.params().max_len, 5);
    }
}
