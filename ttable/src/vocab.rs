//! Vocabulary mapping surface tokens to word indices.
//!
//! ## Usage
//!
//! ```ignore
//! use ttable::{IndexCodec, Vocabulary};
//!
//! let mut vocab = Vocabulary::new(&IndexCodec::default());
//! let house = vocab.intern("house")?;
//! assert_eq!(vocab.lookup("house"), Some(house));
//! assert_eq!(vocab.symbol(house), Some("house"));
//! ```

use std::collections::{HashMap, HashSet};

use crate::codec::IndexCodec;
use crate::corpus::CorpusLine;
use crate::error::{Error, Result};
use crate::model::{CorpusRecord, Phrase, WordIndex};

/// Symbols every vocabulary starts with, at indices 0 through 3.
pub const RESERVED_SYMBOLS: [&str; 4] = ["<unk>", "<s>", "</s>", "<sp_sym1>"];

/// Assigns dense word indices to tokens in first-seen order.
///
/// Indices never exceed the largest index the table's codec can encode, so
/// every interned phrase is storable.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    indices: HashMap<String, WordIndex>,
    symbols: Vec<String>,
    max_index: WordIndex,
}

impl Vocabulary {
    /// Creates a vocabulary holding the reserved symbols, bounded by what
    /// `codec` can encode.
    pub fn new(codec: &IndexCodec) -> Self {
        let mut vocab = Self {
            indices: HashMap::new(),
            symbols: Vec::new(),
            max_index: codec.max_index(),
        };
        for symbol in RESERVED_SYMBOLS {
            vocab.insert(symbol.to_string());
        }
        vocab
    }

    /// Returns the index of `token`, assigning the next free one on first
    /// sight.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` once every encodable index is taken.
    pub fn intern(&mut self, token: &str) -> Result<WordIndex> {
        if let Some(&index) = self.indices.get(token) {
            return Ok(index);
        }
        if self.symbols.len() as u64 > u64::from(self.max_index) {
            return Err(Error::InvalidInput(format!(
                "vocabulary is full: cannot assign an index to '{}' beyond {}",
                token, self.max_index
            )));
        }
        Ok(self.insert(token.to_string()))
    }

    fn insert(&mut self, token: String) -> WordIndex {
        let index = self.symbols.len() as WordIndex;
        self.indices.insert(token.clone(), index);
        self.symbols.push(token);
        index
    }

    pub fn lookup(&self, token: &str) -> Option<WordIndex> {
        self.indices.get(token).copied()
    }

    pub fn symbol(&self, index: WordIndex) -> Option<&str> {
        self.symbols.get(index as usize).map(String::as_str)
    }

    /// Number of symbols, reserved ones included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Interns every token and returns the resulting phrase.
    pub fn intern_phrase<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<Phrase> {
        let words = tokens
            .iter()
            .map(|token| self.intern(token.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Phrase::new(words)
    }

    /// Interns both sides of a corpus line.
    ///
    /// A line whose new tokens do not all fit is rejected before any of them
    /// is assigned an index.
    pub fn intern_line(&mut self, line: &CorpusLine) -> Result<CorpusRecord> {
        let unseen: HashSet<&str> = line
            .source
            .iter()
            .chain(&line.target)
            .map(String::as_str)
            .filter(|token| !self.indices.contains_key(*token))
            .collect();
        let capacity = u64::from(self.max_index) + 1 - self.symbols.len() as u64;
        if unseen.len() as u64 > capacity {
            return Err(Error::InvalidInput(format!(
                "vocabulary is full: {} new tokens exceed the {} remaining indices",
                unseen.len(),
                capacity
            )));
        }

        let source = self.intern_phrase(&line.source)?;
        let target = self.intern_phrase(&line.target)?;
        Ok(CorpusRecord::new(source, target, line.weight))
    }
}
