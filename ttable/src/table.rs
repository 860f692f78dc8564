//! Core PhraseTable implementation with read and write APIs.

use std::sync::Arc;

use async_trait::async_trait;
use common::Storage;
use common::storage::factory::create_storage;

use crate::codec::IndexCodec;
use crate::config::{Config, WriteOptions};
use crate::error::{Error, Result};
use crate::key::{PhraseKey, RecordKeys};
use crate::merge_operator::CountMergeOperator;
use crate::model::{CorpusRecord, Count, EncodedKey, Phrase};
use crate::reader::{PhraseTableRead, PhraseTableReader};
use crate::storage::CountStorage;

/// The phrase count table.
///
/// `PhraseTable` keeps three aggregates per training record: how often the
/// source phrase occurred, how often the target phrase occurred, and how often
/// the two occurred together. Counts only ever grow, and every increment is a
/// storage merge, so concurrent writers never lose updates.
///
/// # Read Operations
///
/// Read operations are provided via the [`PhraseTableRead`] trait, which
/// `PhraseTable` implements. This allows generic code to work with either
/// `PhraseTable` or [`PhraseTableReader`].
///
/// # Thread Safety
///
/// `PhraseTable` is designed to be shared across tasks. All methods take
/// `&self`, and the table can be wrapped in an `Arc`.
///
/// # Example
///
/// ```ignore
/// use ttable::{Config, CorpusRecord, Phrase, PhraseTable, PhraseTableRead};
///
/// let table = PhraseTable::open(Config::default()).await?;
///
/// let source = Phrase::new(vec![10, 2, 12])?;
/// let target = Phrase::new(vec![11])?;
/// table.add_record(&CorpusRecord::new(source, target.clone(), 1.0)).await?;
///
/// assert_eq!(table.target_count(&target).await?, 1);
/// assert_eq!(table.count_sources_for_target(&target).await?, 1);
/// ```
pub struct PhraseTable {
    storage: CountStorage,
    codec: IndexCodec,
}

impl PhraseTable {
    /// Opens or creates a phrase table with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the index width is unsupported or the storage
    /// backend cannot be initialized.
    pub async fn open(config: Config) -> Result<Self> {
        let codec = config.codec()?;
        let storage = create_storage(&config.storage, Some(Self::merge_operator()))
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        tracing::info!(index_width = codec.width(), "opened phrase table");
        Ok(Self::with_storage(storage, codec))
    }

    /// Creates a table over an existing storage.
    ///
    /// The storage must have been opened with [`PhraseTable::merge_operator`].
    pub fn with_storage(storage: Arc<dyn Storage>, codec: IndexCodec) -> Self {
        Self {
            storage: CountStorage::new(storage),
            codec,
        }
    }

    /// The merge operator phrase table storage must be opened with.
    pub fn merge_operator() -> Arc<dyn common::MergeOperator> {
        Arc::new(CountMergeOperator)
    }

    pub fn codec(&self) -> &IndexCodec {
        &self.codec
    }

    /// Adds `delta` to the count stored under `key`.
    ///
    /// Two increments of 5 leave the count at 10. A missing key counts as
    /// zero.
    pub async fn increment(&self, key: EncodedKey, delta: Count) -> Result<()> {
        self.increment_with_options(key, delta, WriteOptions::default())
            .await
    }

    /// Adds `delta` to the count stored under `key` with custom options.
    pub async fn increment_with_options(
        &self,
        key: EncodedKey,
        delta: Count,
        options: WriteOptions,
    ) -> Result<()> {
        self.storage
            .increment_all(vec![(key, delta)], &options)
            .await
    }

    /// Records one source/target pair.
    ///
    /// The source, target and joint counts are incremented by the record's
    /// weight in one atomic batch: either all three change or none do.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` if a word index exceeds the codec's range,
    /// `Error::InvalidInput` for an unusable weight, and `Error::Storage` if
    /// the batch could not be written. Nothing is written in any of these
    /// cases.
    pub async fn add_record(&self, record: &CorpusRecord) -> Result<()> {
        self.add_records_with_options(std::slice::from_ref(record), WriteOptions::default())
            .await
    }

    /// Records many pairs in one atomic batch.
    pub async fn add_records(&self, records: &[CorpusRecord]) -> Result<()> {
        self.add_records_with_options(records, WriteOptions::default())
            .await
    }

    /// Records many pairs in one atomic batch with custom options.
    ///
    /// Every record is validated and encoded before anything is written, so a
    /// bad record aborts the whole batch.
    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub async fn add_records_with_options(
        &self,
        records: &[CorpusRecord],
        options: WriteOptions,
    ) -> Result<()> {
        let mut increments = Vec::with_capacity(records.len() * 3);
        for record in records {
            let delta = record.count_delta()?;
            let keys = RecordKeys::build(&self.codec, &record.source, &record.target)?;
            increments.extend(keys.into_array().into_iter().map(|key| (key, delta)));
        }
        self.storage.increment_all(increments, &options).await?;
        tracing::debug!("applied record batch");
        Ok(())
    }

    /// Returns a read-only view of the table as of now.
    ///
    /// Writes made after this call are not visible through the returned
    /// reader.
    pub async fn snapshot(&self) -> Result<PhraseTableReader> {
        let storage = self.storage.snapshot().await?;
        Ok(PhraseTableReader::from_count_storage(storage, self.codec))
    }

    /// Flushes pending writes to durable storage.
    pub async fn flush(&self) -> Result<()> {
        self.storage.flush().await
    }

    /// Closes the table, releasing resources.
    pub async fn close(self) -> Result<()> {
        self.storage.close().await
    }

    fn reader(&self) -> PhraseTableReader {
        PhraseTableReader::from_count_storage(self.storage.as_read(), self.codec)
    }
}

#[async_trait]
impl PhraseTableRead for PhraseTable {
    async fn get(&self, key: &EncodedKey) -> Result<Count> {
        self.reader().get(key).await
    }

    async fn count(&self, key: &PhraseKey) -> Result<Count> {
        self.reader().count(key).await
    }

    async fn count_sources_for_target(&self, target: &Phrase) -> Result<u64> {
        self.reader().count_sources_for_target(target).await
    }

    async fn sources_for_target(&self, target: &Phrase) -> Result<Vec<(Phrase, Count)>> {
        self.reader().sources_for_target(target).await
    }
}

#[cfg(test)]
mod tests {
    use common::storage::in_memory::{FailingStorage, InMemoryStorage};
    use common::{StorageConfig, StorageError};

    use super::*;
    use crate::model::WordIndex;

    fn phrase(words: &[WordIndex]) -> Phrase {
        Phrase::try_from(words).unwrap()
    }

    fn record(source: &[WordIndex], target: &[WordIndex], weight: f64) -> CorpusRecord {
        CorpusRecord::new(phrase(source), phrase(target), weight)
    }

    fn target_key(table: &PhraseTable, words: &[WordIndex]) -> EncodedKey {
        PhraseKey::Target(phrase(words))
            .encode(table.codec())
            .unwrap()
    }

    async fn sources(table: &impl PhraseTableRead, target: &[WordIndex]) -> u64 {
        let target = phrase(target);
        table.count_sources_for_target(&target).await.unwrap()
    }

    async fn open_table() -> PhraseTable {
        PhraseTable::open(Config {
            storage: StorageConfig::InMemory,
            ..Config::default()
        })
        .await
        .unwrap()
    }

    fn failing_table() -> (PhraseTable, Arc<FailingStorage>) {
        let inner = Arc::new(InMemoryStorage::with_merge_operator(
            PhraseTable::merge_operator(),
        ));
        let failing = FailingStorage::wrap(inner);
        let table = PhraseTable::with_storage(failing.clone(), IndexCodec::default());
        (table, failing)
    }

    fn storage_error(msg: &str) -> StorageError {
        StorageError::Storage(msg.to_string())
    }

    #[tokio::test]
    async fn should_open_table_with_in_memory_config() {
        // when
        let result = PhraseTable::open(Config::default()).await;

        // then
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_reject_unsupported_index_width_on_open() {
        // given
        let config = Config {
            index_width: 6,
            ..Config::default()
        };

        // when
        let result = PhraseTable::open(config).await;

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_return_zero_for_empty_table() {
        // given
        let table = open_table().await;
        let key = target_key(&table, &[1, 2]);

        // when
        let count = table.get(&key).await.unwrap();

        // then
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn should_add_increments() {
        // given
        let table = open_table().await;
        let key = target_key(&table, &[3]);

        // when
        table.increment(key.clone(), 5).await.unwrap();
        table.increment(key.clone(), 5).await.unwrap();

        // then
        assert_eq!(table.get(&key).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn should_count_records_by_source_target_and_pair() {
        // given
        let table = open_table().await;

        // when
        table
            .add_records(&[
                record(&[10, 2, 12], &[11], 1.0),
                record(&[10, 3], &[11], 1.0),
            ])
            .await
            .unwrap();

        // then
        let (target, source) = (phrase(&[11]), phrase(&[10, 3]));
        assert_eq!(table.target_count(&target).await.unwrap(), 2);
        assert_eq!(table.source_count(&phrase(&[10, 2, 12])).await.unwrap(), 1);
        assert_eq!(table.joint_count(&target, &source).await.unwrap(), 1);
        assert_eq!(sources(&table, &[11]).await, 2);
        assert_eq!(table.target_count(&phrase(&[10, 2, 12])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_count_only_sources_of_each_target() {
        // given
        let table = open_table().await;
        table
            .add_records(&[
                record(&[1], &[20], 1.0),
                record(&[2], &[20], 1.0),
                record(&[3], &[21], 1.0),
                record(&[4], &[21], 1.0),
                record(&[5], &[21], 1.0),
            ])
            .await
            .unwrap();

        // when
        let t1 = sources(&table, &[20]).await;
        let t2 = sources(&table, &[21]).await;

        // then
        assert_eq!(t1, 2);
        assert_eq!(t2, 3);
    }

    #[tokio::test]
    async fn should_not_count_sources_of_targets_extending_the_query() {
        // given
        let table = open_table().await;
        table
            .add_records(&[record(&[1], &[20], 1.0), record(&[2], &[20, 5], 1.0)])
            .await
            .unwrap();

        // when
        let count = sources(&table, &[20]).await;

        // then
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn should_truncate_fractional_weights() {
        // given
        let table = open_table().await;

        // when
        table.add_record(&record(&[1], &[2], 2.7)).await.unwrap();

        // then
        assert_eq!(table.target_count(&phrase(&[2])).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn should_leave_all_aggregates_unchanged_when_batch_fails() {
        // given
        let (table, failing) = failing_table();
        table.add_record(&record(&[1], &[2], 1.0)).await.unwrap();
        failing.fail_apply_once(storage_error("disk full"));

        // when
        let result = table.add_record(&record(&[1], &[2], 1.0)).await;

        // then
        let (source, target) = (phrase(&[1]), phrase(&[2]));
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(table.source_count(&source).await.unwrap(), 1);
        assert_eq!(table.target_count(&target).await.unwrap(), 1);
        assert_eq!(table.joint_count(&target, &source).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn should_abort_batch_before_writing_when_encoding_fails() {
        // given
        let storage = Arc::new(InMemoryStorage::with_merge_operator(
            PhraseTable::merge_operator(),
        ));
        let table = PhraseTable::with_storage(storage, IndexCodec::new(1).unwrap());
        let records = [record(&[1], &[2], 1.0), record(&[1], &[1_000], 1.0)];

        // when
        let result = table.add_records(&records).await;

        // then
        match result {
            Err(Error::Encoding(msg)) => assert!(msg.contains("[1000]"), "{}", msg),
            other => panic!("expected encoding error, got {:?}", other),
        }
        assert_eq!(table.source_count(&phrase(&[1])).await.unwrap(), 0);
        assert_eq!(table.target_count(&phrase(&[2])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_reject_negative_weight() {
        // given
        let table = open_table().await;

        // when
        let result = table.add_record(&record(&[1], &[2], -1.0)).await;

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(table.target_count(&phrase(&[2])).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_not_lose_concurrent_increments() {
        // given
        let table = Arc::new(open_table().await);
        let key = target_key(&table, &[9]);

        // when
        let mut handles = Vec::new();
        for _ in 0..16 {
            let table = Arc::clone(&table);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    table.increment(key.clone(), 1).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // then
        assert_eq!(table.get(&key).await.unwrap(), 800);
    }

    #[tokio::test]
    async fn should_hide_later_writes_from_snapshot() {
        // given
        let table = open_table().await;
        table.add_record(&record(&[1], &[2], 1.0)).await.unwrap();
        let snapshot = table.snapshot().await.unwrap();

        // when
        table.add_record(&record(&[3], &[2], 1.0)).await.unwrap();

        // then
        assert_eq!(snapshot.target_count(&phrase(&[2])).await.unwrap(), 1);
        assert_eq!(sources(&snapshot, &[2]).await, 1);
        assert_eq!(table.target_count(&phrase(&[2])).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn should_propagate_scan_failure_from_range_query() {
        // given
        let (table, failing) = failing_table();
        table.add_record(&record(&[1], &[2], 1.0)).await.unwrap();
        failing.fail_scan_once(storage_error("io error"));

        // when
        let result = table.count_sources_for_target(&phrase(&[2])).await;

        // then
        match result {
            Err(Error::Storage(msg)) => assert!(msg.contains("target [2]"), "{}", msg),
            other => panic!("expected storage error, got {:?}", other),
        }
        assert_eq!(sources(&table, &[2]).await, 1);
    }

    #[tokio::test]
    async fn should_propagate_snapshot_failure() {
        // given
        let (table, failing) = failing_table();
        failing.fail_snapshot_once(StorageError::Internal("no snapshot".to_string()));

        // when
        let result = table.snapshot().await;

        // then
        assert!(matches!(result, Err(Error::Internal(_))));
        assert!(table.snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn should_reject_every_batch_until_failure_cleared() {
        // given
        let (table, failing) = failing_table();
        failing.fail_apply(storage_error("disk full"));

        // when
        let first = table.add_record(&record(&[1], &[2], 1.0)).await;
        let second = table.add_record(&record(&[1], &[2], 1.0)).await;
        failing.clear();
        table.add_record(&record(&[1], &[2], 1.0)).await.unwrap();

        // then
        assert!(matches!(first, Err(Error::Storage(_))));
        assert!(matches!(second, Err(Error::Storage(_))));
        assert_eq!(table.target_count(&phrase(&[2])).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn should_flush_after_durable_write() {
        // given
        let (table, failing) = failing_table();
        failing.fail_flush_once(storage_error("flush failed"));

        // when
        let result = table
            .add_records_with_options(
                &[record(&[1], &[2], 1.0)],
                WriteOptions {
                    await_durable: true,
                },
            )
            .await;

        // then
        assert!(matches!(result, Err(Error::Storage(_))));
    }
}
