//! Data types for phrase table operations.

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Identifier of a vocabulary symbol.
pub type WordIndex = u32;

/// Accumulated occurrence count stored against one key.
pub type Count = u64;

/// A non-empty sequence of word indices: a source phrase, a target phrase,
/// or one side of a joint key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Phrase(Vec<WordIndex>);

impl Phrase {
    /// Creates a phrase, rejecting empty sequences.
    pub fn new(words: Vec<WordIndex>) -> Result<Self> {
        if words.is_empty() {
            return Err(Error::InvalidInput("phrase must not be empty".to_string()));
        }
        Ok(Self(words))
    }

    pub fn as_slice(&self) -> &[WordIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: phrases are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<WordIndex> {
        self.0
    }
}

impl TryFrom<Vec<WordIndex>> for Phrase {
    type Error = Error;

    fn try_from(words: Vec<WordIndex>) -> Result<Self> {
        Phrase::new(words)
    }
}

impl TryFrom<&[WordIndex]> for Phrase {
    type Error = Error;

    fn try_from(words: &[WordIndex]) -> Result<Self> {
        Phrase::new(words.to_vec())
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, word) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", word)?;
        }
        write!(f, "]")
    }
}

/// Storage key produced by the index codec.
///
/// Byte-lexicographic order on encoded keys matches lexicographic order on
/// the word index sequences they were built from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncodedKey(Bytes);

impl EncodedKey {
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for EncodedKey {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for EncodedKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One line of training data.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusRecord {
    pub source: Phrase,
    pub target: Phrase,
    /// Occurrence weight of the pair.
    pub weight: f64,
}

impl CorpusRecord {
    pub fn new(source: Phrase, target: Phrase, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }

    /// Count delta contributed by this record.
    ///
    /// Fractional weights are truncated toward zero. Negative, NaN and
    /// infinite weights are rejected.
    pub fn count_delta(&self) -> Result<Count> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::InvalidInput(format!(
                "weight {} of record source {} target {} must be a finite non-negative number",
                self.weight, self.source, self.target
            )));
        }
        // `as` saturates for values beyond u64::MAX
        Ok(self.weight.trunc() as Count)
    }
}
