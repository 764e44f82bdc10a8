use std::{
    fmt::{self, Display},
    ops::{BitOr, BitOrAssign},
};

use crate::Error;

pub const ALPHABET: &[u8; ALPHABET_LEN] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-";
pub const ALPHABET_LEN: usize = 53;

/// A melodic interval symbol.
///
/// Uppercase letters are ascending intervals (`A` = 1 up to `Z` = 26), lowercase letters are
/// descending ones (`a` = -1 down to `z` = -26) and `-` is a repeated note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid interval symbol {:?}", char::from(*.0))]
pub struct InvalidSymbol(pub u8);

impl Symbol {
    pub const REPEAT: Self = Self(52);

    /// Dense index in `0..ALPHABET_LEN`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        (index < ALPHABET_LEN).then(|| Self(index as u8))
    }

    /// Signed interval value of the symbol.
    #[inline]
    pub const fn interval(self) -> i32 {
        match self.0 {
            0..=25 => self.0 as i32 + 1,
            26..=51 => -(self.0 as i32 - 25),
            _ => 0,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        ALPHABET[self.index()]
    }

    #[inline]
    pub fn to_char(self) -> char {
        char::from(self.to_byte())
    }

    pub fn all() -> impl Iterator<Item = Self> + Clone {
        (0..ALPHABET_LEN as u8).map(Self)
    }
}

impl TryFrom<u8> for Symbol {
    type Error = InvalidSymbol;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let index = match value {
            b'A'..=b'Z' => value - b'A',
            b'a'..=b'z' => value - b'a' + 26,
            b'-' => 52,
            _ => return Err(InvalidSymbol(value)),
        };

        Ok(Self(index))
    }
}

impl TryFrom<char> for Symbol {
    type Error = InvalidSymbol;

    #[inline]
    fn try_from(value: char) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InvalidSymbol(b'?'))
            .and_then(Symbol::try_from)
    }
}

impl Display for Symbol {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Validates and encodes a textual sequence.
pub fn encode(sequence: &str) -> Result<Vec<Symbol>, Error> {
    sequence
        .chars()
        .enumerate()
        .map(|(position, symbol)| {
            Symbol::try_from(symbol).map_err(|_| Error::InvalidSymbol { symbol, position })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence<'a>(pub &'a [Symbol]);

impl Display for Sequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|symbol| Display::fmt(symbol, f))
    }
}

/// Set of symbols packed in the low 53 bits of a word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SymbolSet(u64);

impl SymbolSet {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn single(symbol: Symbol) -> Self {
        Self(1 << symbol.index())
    }

    #[inline]
    pub fn insert(&mut self, symbol: Symbol) {
        self.0 |= 1 << symbol.index();
    }

    #[inline]
    pub fn contains(self, symbol: Symbol) -> bool {
        self.0 & (1 << symbol.index()) != 0
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub fn symmetric_difference(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Symbol> {
        Symbol::all().filter(move |&symbol| self.contains(symbol))
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, symbol| set | Self::single(symbol))
    }
}

impl<'a> FromIterator<&'a Symbol> for SymbolSet {
    fn from_iter<T: IntoIterator<Item = &'a Symbol>>(iter: T) -> Self {
        iter.into_iter().copied().collect()
    }
}

impl BitOr for SymbolSet {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SymbolSet {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
pub(crate) fn seq(sequence: &str) -> Vec<Symbol> {
    encode(sequence).unwrap()
}
