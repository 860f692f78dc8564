//! Keys derived from phrases.
//!
//! Three disjoint key spaces share one sorted store:
//!
//! ```text
//! Source: | SEP | enc(source) |
//! Target: | enc(target) |
//! Joint:  | enc(target) | SEP | enc(source) |
//! ```
//!
//! Source keys are the only keys starting with a separator block. Target keys
//! contain no separator. Joint keys for one target sort directly after the
//! target key and before any longer target extending it, so every source
//! recorded against a target lives in one contiguous range.

use bytes::BytesMut;

use crate::codec::{IndexCodec, Marker};
use crate::error::{Error, Result};
use crate::model::{EncodedKey, Phrase};

/// A count table key, tagged by the aggregate it addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhraseKey {
    /// Occurrences of a source phrase.
    Source(Phrase),
    /// Occurrences of a target phrase.
    Target(Phrase),
    /// Co-occurrences of a target phrase with a source phrase.
    Joint { target: Phrase, source: Phrase },
}

impl PhraseKey {
    pub fn joint(target: Phrase, source: Phrase) -> Self {
        PhraseKey::Joint { target, source }
    }

    /// Encodes the key for storage.
    pub fn encode(&self, codec: &IndexCodec) -> Result<EncodedKey> {
        let mut buf = BytesMut::with_capacity(self.encoded_len(codec));
        match self {
            PhraseKey::Source(source) => {
                codec.write_marker(Marker::Separator, &mut buf);
                codec
                    .write_sequence(source.as_slice(), &mut buf)
                    .map_err(|e| e.context(format!("source phrase {}", source)))?;
            }
            PhraseKey::Target(target) => {
                codec
                    .write_sequence(target.as_slice(), &mut buf)
                    .map_err(|e| e.context(format!("target phrase {}", target)))?;
            }
            PhraseKey::Joint { target, source } => {
                codec
                    .write_sequence(target.as_slice(), &mut buf)
                    .map_err(|e| e.context(format!("target phrase {}", target)))?;
                codec.write_marker(Marker::Separator, &mut buf);
                codec
                    .write_sequence(source.as_slice(), &mut buf)
                    .map_err(|e| e.context(format!("source phrase {}", source)))?;
            }
        }
        Ok(EncodedKey::from(buf.freeze()))
    }

    /// Recovers the tagged key from bytes produced by [`PhraseKey::encode`].
    pub fn decode(codec: &IndexCodec, key: &[u8]) -> Result<Self> {
        let width = codec.width();
        if key.is_empty() || !key.len().is_multiple_of(width) {
            return Err(Error::Encoding(format!(
                "key length {} is not a positive multiple of index width {}",
                key.len(),
                width
            )));
        }

        let mut separators = key
            .chunks_exact(width)
            .enumerate()
            .filter(|(_, block)| codec.marker_of(block) == Some(Marker::Separator))
            .map(|(position, _)| position * width);
        let separator = separators.next();
        if separators.next().is_some() {
            return Err(Error::Encoding(
                "key contains more than one separator".to_string(),
            ));
        }

        let decode_phrase = |bytes: &[u8]| -> Result<Phrase> {
            Phrase::new(codec.decode_sequence(bytes)?)
                .map_err(|_| Error::Encoding("key holds an empty phrase".to_string()))
        };
        match separator {
            None => Ok(PhraseKey::Target(decode_phrase(key)?)),
            Some(0) => Ok(PhraseKey::Source(decode_phrase(&key[width..])?)),
            Some(at) => Ok(PhraseKey::Joint {
                target: decode_phrase(&key[..at])?,
                source: decode_phrase(&key[at + width..])?,
            }),
        }
    }

    /// Short name of the aggregate, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PhraseKey::Source(_) => "source",
            PhraseKey::Target(_) => "target",
            PhraseKey::Joint { .. } => "joint",
        }
    }

    fn encoded_len(&self, codec: &IndexCodec) -> usize {
        let words = match self {
            PhraseKey::Source(source) => source.len() + 1,
            PhraseKey::Target(target) => target.len(),
            PhraseKey::Joint { target, source } => target.len() + 1 + source.len(),
        };
        words * codec.width()
    }
}

/// The three keys one training record increments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    pub source: EncodedKey,
    pub target: EncodedKey,
    pub joint: EncodedKey,
}

impl RecordKeys {
    /// Builds the source, target and joint keys for a source/target pair.
    pub fn build(codec: &IndexCodec, source: &Phrase, target: &Phrase) -> Result<Self> {
        let joint = PhraseKey::joint(target.clone(), source.clone());
        Ok(Self {
            source: PhraseKey::Source(source.clone()).encode(codec)?,
            target: PhraseKey::Target(target.clone()).encode(codec)?,
            joint: joint.encode(codec)?,
        })
    }

    pub fn into_array(self) -> [EncodedKey; 3] {
        [self.source, self.target, self.joint]
    }
}
