//! Merge operator that accumulates counts inside the store.
//!
//! Increments are written as merge operands holding a count delta. The store
//! folds operands into the stored value under its own write ordering, so
//! concurrent increments of one key never lose updates.

use bytes::Bytes;
use common::MergeOperator;

use crate::serde::{decode_count, encode_count};

/// Sums little-endian `u64` counts, saturating at `u64::MAX`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountMergeOperator;

impl MergeOperator for CountMergeOperator {
    fn merge(&self, key: &Bytes, existing_value: Option<Bytes>, new_value: Bytes) -> Bytes {
        let existing = existing_value
            .as_deref()
            .map(|value| {
                decode_count(value).unwrap_or_else(|err| {
                    tracing::error!(key = ?key, %err, "dropping corrupt stored count");
                    0
                })
            })
            .unwrap_or(0);
        let delta = decode_count(&new_value).unwrap_or_else(|err| {
            tracing::error!(key = ?key, %err, "ignoring corrupt count operand");
            0
        });
        encode_count(existing.saturating_add(delta))
    }
}
