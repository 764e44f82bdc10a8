use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    ops::Not,
    path::Path,
};

use fnv::FnvHashMap;

use crate::{
    alphabet::{self, Symbol},
    Error,
};

/// Position of an entry inside its [`Corpus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub usize);

impl EntryId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    sequence: Vec<Symbol>,
}

impl Entry {
    #[inline]
    pub fn new(id: impl Into<String>, sequence: Vec<Symbol>) -> Self {
        Self {
            id: id.into(),
            sequence,
        }
    }

    pub fn parse(id: impl Into<String>, sequence: &str) -> Result<Self, Error> {
        Ok(Self::new(id, alphabet::encode(sequence)?))
    }

    #[inline]
    pub fn sequence(&self) -> &[Symbol] {
        &self.sequence
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Immutable collection of reference sequences.
///
/// Entries keep their insertion order; engines refer to them through [`EntryId`]s and never
/// reorder the corpus itself.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<Entry>,
    ids: FnvHashMap<String, EntryId>,
    min_len: usize,
    max_len: usize,
    total_len: usize,
}

impl Corpus {
    pub fn new(entries: Vec<Entry>) -> Self {
        let ids = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.id.clone(), EntryId(index)))
            .collect();

        let lengths = entries.iter().map(Entry::len);
        let min_len = lengths.clone().min().unwrap_or(0);
        let max_len = lengths.clone().max().unwrap_or(0);
        let total_len = lengths.sum();

        Self {
            entries,
            ids,
            min_len,
            max_len,
            total_len,
        }
    }

    /// Builds a corpus from `(id, sequence)` pairs, validating every sequence.
    pub fn from_pairs<I, K, S>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(id, sequence)| Entry::parse(id, sequence.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline]
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.index()]
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.position(id).map(|id| self.entry(id))
    }

    #[inline]
    pub fn position(&self, id: &str) -> Option<EntryId> {
        self.ids.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (EntryId(index), entry))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Sum of the lengths of all the entries.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.total_len
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("missing sequence for entry at line {0}")]
    MissingSequence(usize),

    #[error("invalid interval symbol at line {} and column {}", .0.row, .0.column)]
    InvalidSymbol(Box<RowColumn>),

    #[error("corpus does not contain any entry")]
    Empty,

    #[error("I/O error: {0}")]
    IO(#[from] Box<io::Error>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowColumn {
    pub row: usize,
    pub column: usize,
}

/// Reads a corpus made of lines containing an identifier and a sequence, separated by
/// whitespace. Blank lines are skipped.
#[inline]
pub fn read_file(path: &Path) -> Result<Corpus, ReadError> {
    let reader = BufReader::new(File::open(path).map_err(Box::new)?);
    read_file_content(reader)
}

fn read_file_content<R>(mut reader: R) -> Result<Corpus, ReadError>
where
    R: BufRead,
{
    let mut line = String::new();
    let mut entries = Vec::new();

    let mut file_row = 0;
    loop {
        line.clear();
        file_row += 1;
        if reader.read_line(&mut line).map_err(Box::new)? == 0 {
            break;
        }

        let line = line.trim_end();
        let Some((id, rest)) = line.trim_start().split_once(char::is_whitespace) else {
            if line.trim().is_empty().not() {
                return Err(ReadError::MissingSequence(file_row));
            }
            continue;
        };

        let sequence_start = line.len() - rest.trim_start().len();
        let sequence = line[sequence_start..]
            .bytes()
            .enumerate()
            .take_while(|(_, c)| c.is_ascii_whitespace().not())
            .map(|(index, c)| {
                Symbol::try_from(c).map_err(|_| {
                    ReadError::InvalidSymbol(Box::new(RowColumn {
                        row: file_row,
                        column: sequence_start + index + 1,
                    }))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        entries.push(Entry::new(id, sequence));
    }

    if entries.is_empty() {
        return Err(ReadError::Empty);
    }

    Ok(Corpus::new(entries))
}
