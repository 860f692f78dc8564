//! Value encoding for stored counts.
//!
//! ```text
//! Value: | count (u64, little-endian) |
//! ```

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::model::Count;

/// Size of an encoded count value.
pub const COUNT_VALUE_LEN: usize = 8;

pub fn encode_count(count: Count) -> Bytes {
    Bytes::copy_from_slice(&count.to_le_bytes())
}

pub fn decode_count(value: &[u8]) -> Result<Count> {
    let bytes: [u8; COUNT_VALUE_LEN] = value.try_into().map_err(|_| {
        Error::Encoding(format!(
            "count value must be {} bytes, got {}",
            COUNT_VALUE_LEN,
            value.len()
        ))
    })?;
    Ok(Count::from_le_bytes(bytes))
}
