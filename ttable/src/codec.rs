//! Order-preserving fixed-width encoding of word indices.
//!
//! Every word index is written as `width` base-254 digits, most significant
//! first, with digit `d` stored as the byte `d + 1`:
//!
//! ```text
//! index 0      -> 01 01 01 01 01
//! index 253    -> 01 01 01 01 fe
//! index 254    -> 01 01 01 02 01
//! SEP marker   -> 00 00 00 00 00
//! HI marker    -> ff ff ff ff ff
//! ```
//!
//! Since digits never use `0x00` or `0xFF`, those bytes are free to act as
//! markers that sort strictly below and strictly above every symbol. Fixed
//! width plus big-endian digits make byte-lexicographic order on encoded
//! sequences equal to lexicographic order on the sequences, with a proper
//! prefix sorting first.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::model::{EncodedKey, WordIndex};

/// Number of distinct values one key byte can carry as a digit.
pub const DIGIT_BASE: u64 = 254;

/// Bytes per word index unless configured otherwise.
pub const DEFAULT_INDEX_WIDTH: usize = 5;

/// Widest supported encoding; five digits already cover every `u32`.
pub const MAX_INDEX_WIDTH: usize = 5;

/// Reserved key blocks that never encode a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// All `0x00`: separates the target and source halves of a joint key and
    /// prefixes source-only keys.
    Separator,
    /// All `0xFF`: exclusive upper bound for range scans.
    Upper,
}

impl Marker {
    fn byte(self) -> u8 {
        match self {
            Marker::Separator => 0x00,
            Marker::Upper => 0xFF,
        }
    }
}

/// Encoder/decoder between word indices and fixed-width key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCodec {
    width: usize,
    max_index: WordIndex,
}

impl Default for IndexCodec {
    fn default() -> Self {
        Self {
            width: DEFAULT_INDEX_WIDTH,
            max_index: WordIndex::MAX,
        }
    }
}

impl IndexCodec {
    /// Creates a codec writing `width` bytes per word index.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `width` is outside `1..=5`.
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 || width > MAX_INDEX_WIDTH {
            return Err(Error::InvalidInput(format!(
                "index width must be between 1 and {}, got {}",
                MAX_INDEX_WIDTH, width
            )));
        }
        let capacity = DIGIT_BASE.pow(width as u32);
        let max_index = (capacity - 1).min(WordIndex::MAX as u64) as WordIndex;
        Ok(Self { width, max_index })
    }

    /// Bytes written per word index.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Largest word index this codec can encode.
    pub fn max_index(&self) -> WordIndex {
        self.max_index
    }

    /// Encodes a single word index into exactly `width` bytes.
    pub fn encode_index(&self, index: WordIndex) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.width);
        self.write_index(index, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Encodes a sequence as the concatenation of its encoded indices.
    pub fn encode_sequence(&self, sequence: &[WordIndex]) -> Result<EncodedKey> {
        let mut buf = BytesMut::with_capacity(self.width * sequence.len());
        self.write_sequence(sequence, &mut buf)?;
        Ok(EncodedKey::from(buf.freeze()))
    }

    /// Appends the encoding of `index` to `buf`.
    ///
    /// Fails without writing anything if `index` needs more digits than the
    /// configured width.
    pub fn write_index(&self, index: WordIndex, buf: &mut BytesMut) -> Result<()> {
        if index > self.max_index {
            return Err(Error::Encoding(format!(
                "word index {} exceeds maximum {} for {}-byte keys",
                index, self.max_index, self.width
            )));
        }
        let value = index as u64;
        for position in (0..self.width).rev() {
            let digit = (value / DIGIT_BASE.pow(position as u32)) % DIGIT_BASE;
            buf.put_u8(digit as u8 + 1);
        }
        Ok(())
    }

    pub fn write_sequence(&self, sequence: &[WordIndex], buf: &mut BytesMut) -> Result<()> {
        for &index in sequence {
            self.write_index(index, buf)?;
        }
        Ok(())
    }

    /// Appends a reserved marker block of `width` bytes.
    pub fn write_marker(&self, marker: Marker, buf: &mut BytesMut) {
        buf.put_bytes(marker.byte(), self.width);
    }

    /// Returns the marker a block spells, if any.
    pub fn marker_of(&self, block: &[u8]) -> Option<Marker> {
        if block.len() != self.width {
            return None;
        }
        [Marker::Separator, Marker::Upper]
            .into_iter()
            .find(|marker| block.iter().all(|&b| b == marker.byte()))
    }

    /// Decodes exactly one encoded word index.
    pub fn decode_index(&self, block: &[u8]) -> Result<WordIndex> {
        if block.len() != self.width {
            return Err(Error::Encoding(format!(
                "encoded index must be {} bytes, got {}",
                self.width,
                block.len()
            )));
        }
        let mut value: u64 = 0;
        for &byte in block {
            if byte == 0x00 || byte == 0xFF {
                return Err(Error::Encoding(format!(
                    "byte 0x{:02x} is a marker, not a digit",
                    byte
                )));
            }
            value = value * DIGIT_BASE + (byte - 1) as u64;
        }
        WordIndex::try_from(value).map_err(|_| {
            Error::Encoding(format!("decoded value {} does not fit a word index", value))
        })
    }

    /// Decodes a key made only of encoded word indices.
    pub fn decode_sequence(&self, bytes: &[u8]) -> Result<Vec<WordIndex>> {
        if !bytes.len().is_multiple_of(self.width) {
            return Err(Error::Encoding(format!(
                "key length {} is not a multiple of index width {}",
                bytes.len(),
                self.width
            )));
        }
        bytes
            .chunks_exact(self.width)
            .map(|block| self.decode_index(block))
            .collect()
    }
}
