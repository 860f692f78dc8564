//! Range queries over the joint key space.
//!
//! All joint keys recorded against a target `T` share the prefix
//! `enc(T) | SEP`, and every source phrase starts with a symbol block that
//! sorts below the `HI` marker. Scanning
//!
//! ```text
//! [ enc(T) | SEP , enc(T) | SEP | HI )
//! ```
//!
//! therefore visits exactly the joint entries of `T`: no source-only key
//! (those start with `SEP`), no target-only key (those hold no `SEP`), and no
//! joint key of a longer target extending `T`.

use bytes::BytesMut;
use common::BytesRange;

use crate::codec::{IndexCodec, Marker};
use crate::error::{Error, Result};
use crate::key::PhraseKey;
use crate::model::{Count, Phrase};
use crate::storage::CountStorageRead;

/// Key range holding the joint entries of `target`.
pub(crate) fn joint_range(codec: &IndexCodec, target: &Phrase) -> Result<BytesRange> {
    let mut lower = BytesMut::with_capacity((target.len() + 1) * codec.width());
    codec
        .write_sequence(target.as_slice(), &mut lower)
        .map_err(|e| e.context(format!("target phrase {}", target)))?;
    codec.write_marker(Marker::Separator, &mut lower);

    let mut upper = lower.clone();
    codec.write_marker(Marker::Upper, &mut upper);

    Ok(BytesRange::half_open(lower.freeze(), upper.freeze()))
}

/// Counts the distinct source phrases recorded jointly with `target`.
///
/// This is a cardinality, not a sum of joint counts. No matches yields zero.
#[tracing::instrument(level = "debug", skip_all, fields(target = %target))]
pub(crate) async fn count_sources_for_target(
    storage: &CountStorageRead,
    codec: &IndexCodec,
    target: &Phrase,
) -> Result<u64> {
    let range = joint_range(codec, target)?;
    let mut iter = storage
        .scan(range)
        .await
        .map_err(|e| e.context(format!("scanning sources of target {}", target)))?;

    let mut sources = 0;
    while iter
        .next_key()
        .await
        .map_err(|e| e.context(format!("scanning sources of target {}", target)))?
        .is_some()
    {
        sources += 1;
    }
    tracing::debug!(sources, "counted sources for target");
    Ok(sources)
}

/// Lists the source phrases recorded with `target` and their joint counts,
/// in key order.
#[tracing::instrument(level = "debug", skip_all, fields(target = %target))]
pub(crate) async fn sources_for_target(
    storage: &CountStorageRead,
    codec: &IndexCodec,
    target: &Phrase,
) -> Result<Vec<(Phrase, Count)>> {
    let range = joint_range(codec, target)?;
    let mut iter = storage.scan(range).await?;

    let mut sources = Vec::new();
    while let Some((key, count)) = iter.next().await? {
        match PhraseKey::decode(codec, &key)? {
            PhraseKey::Joint { source, .. } => sources.push((source, count)),
            other => {
                return Err(Error::Internal(format!(
                    "{} key found inside joint range of target {}",
                    other.kind(),
                    target
                )));
            }
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteOptions;
    use crate::key::RecordKeys;
    use crate::model::WordIndex;
    use crate::storage::CountStorage;

    fn phrase(words: &[WordIndex]) -> Phrase {
        Phrase::try_from(words).unwrap()
    }

    async fn record(storage: &CountStorage, source: &[WordIndex], target: &[WordIndex], n: u64) {
        let codec = IndexCodec::default();
        let keys = RecordKeys::build(&codec, &phrase(source), &phrase(target)).unwrap();
        let increments = keys.into_array().into_iter().map(|k| (k, n)).collect();
        storage
            .increment_all(increments, &WriteOptions::default())
            .await
            .unwrap();
    }

    async fn sources_of(storage: &CountStorage, target: &[WordIndex]) -> u64 {
        count_sources_for_target(&storage.as_read(), &IndexCodec::default(), &phrase(target))
            .await
            .unwrap()
    }

    #[test]
    fn should_bound_range_by_separator_and_upper_marker() {
        // when
        let range = joint_range(&IndexCodec::default(), &phrase(&[11])).unwrap();

        // then
        let mut lower = IndexCodec::default().encode_index(11).unwrap().to_vec();
        lower.extend_from_slice(&[0x00; 5]);
        let mut upper = lower.clone();
        upper.extend_from_slice(&[0xFF; 5]);
        assert_eq!(range, BytesRange::half_open(lower.into(), upper.into()));
    }

    #[tokio::test]
    async fn should_count_only_sources_of_queried_target() {
        // given
        let storage = CountStorage::in_memory();
        record(&storage, &[1], &[20], 1).await;
        record(&storage, &[2], &[20], 1).await;
        record(&storage, &[3], &[21], 1).await;

        // when
        let count = sources_of(&storage, &[20]).await;

        // then
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn should_count_distinct_sources_not_occurrences() {
        // given
        let storage = CountStorage::in_memory();
        record(&storage, &[1], &[20], 7).await;
        record(&storage, &[1], &[20], 3).await;

        // when
        let count = sources_of(&storage, &[20]).await;

        // then
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn should_ignore_longer_targets_extending_the_query() {
        // given
        let storage = CountStorage::in_memory();
        record(&storage, &[1], &[20], 1).await;
        record(&storage, &[2], &[20, 0], 1).await;
        record(&storage, &[3], &[20, WordIndex::MAX], 1).await;

        // when
        let count = sources_of(&storage, &[20]).await;

        // then
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn should_return_zero_when_target_has_no_sources() {
        // given
        let storage = CountStorage::in_memory();
        record(&storage, &[20], &[1], 1).await;

        // when
        let count = sources_of(&storage, &[20]).await;

        // then
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn should_list_sources_with_joint_counts() {
        // given
        let storage = CountStorage::in_memory();
        record(&storage, &[5, 6], &[20], 2).await;
        record(&storage, &[4], &[20], 1).await;
        record(&storage, &[5, 6], &[20], 3).await;

        // when
        let (read, codec) = (storage.as_read(), IndexCodec::default());
        let sources = sources_for_target(&read, &codec, &phrase(&[20]))
            .await
            .unwrap();

        // then
        assert_eq!(sources, vec![(phrase(&[4]), 1), (phrase(&[5, 6]), 5)]);
    }
}
