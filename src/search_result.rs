use std::{cmp::Ordering, io};

use rayon::slice::ParallelSliceMut;
use serde::Serialize;
use tabled::Tabled;

use crate::corpus::{Entry, EntryId};

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SearchResult {
    #[serde(rename = "Entry")]
    #[tabled(rename = "Entry")]
    pub id: String,

    #[serde(rename = "Score")]
    #[tabled(rename = "Score", display_with = "display_score")]
    pub score: f64,

    #[serde(rename = "Significant")]
    #[tabled(rename = "", display_with = "display_significant")]
    pub significant: bool,

    #[serde(skip)]
    #[tabled(skip)]
    pub entry: EntryId,
}

impl SearchResult {
    #[inline]
    pub fn new(entry: EntryId, db_entry: &Entry, score: f64, significant: bool) -> Self {
        Self {
            id: db_entry.id.clone(),
            score,
            significant,
            entry,
        }
    }
}

/// Order in which results are reported.
///
/// Significant results always come first, then scores are compared according to the variant.
/// Remaining ties are broken by corpus position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Lower scores are better (distances).
    Ascending,

    /// Higher scores are better (similarities).
    Descending,
}

impl Ranking {
    pub fn compare(self, a: &SearchResult, b: &SearchResult) -> Ordering {
        b.significant
            .cmp(&a.significant)
            .then_with(|| match self {
                Ranking::Ascending => a.score.total_cmp(&b.score),
                Ranking::Descending => b.score.total_cmp(&a.score),
            })
            .then_with(|| a.entry.cmp(&b.entry))
    }

    #[inline]
    pub fn sort(self, results: &mut [SearchResult]) {
        results.par_sort_unstable_by(|a, b| self.compare(a, b));
    }
}

/// Writes results as CSV, one row per result, prefixed by the query label.
pub fn write_csv<W, I>(writer: W, results: I) -> csv::Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = (String, SearchResult)>,
{
    #[derive(Serialize)]
    struct Row<'a> {
        #[serde(rename = "Query")]
        query: &'a str,

        #[serde(rename = "Entry")]
        entry: &'a str,

        #[serde(rename = "Score")]
        score: f64,

        #[serde(rename = "Significant")]
        significant: bool,
    }

    let mut writer = csv::WriterBuilder::new().from_writer(writer);
    results.into_iter().try_for_each(|(query, result)| {
        writer.serialize(Row {
            query: &query,
            entry: &result.id,
            score: result.score,
            significant: result.significant,
        })
    })?;
    writer.flush()?;
    Ok(())
}

fn display_score(score: &f64) -> String {
    if score.fract() == 0. {
        format!("{score:.0}")
    } else {
        format!("{score:.4}")
    }
}

fn display_significant(significant: &bool) -> String {
    let status = if *significant { "!" } else { "?" };
    status.to_string()
}
