use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{MergeOperator, Storage, StorageSnapshot, WriteOptions};
use crate::storage::RecordOp;
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// In-memory implementation of the Storage trait using a BTreeMap.
///
/// This implementation stores all data in memory and is useful for testing
/// or scenarios where durability is not required. Write batches are applied
/// under a single write lock, so merges are serialized per store.
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
    merge_operator: Option<Arc<dyn MergeOperator>>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            merge_operator: None,
        }
    }

    /// Creates a new InMemoryStorage instance with a merge operator.
    ///
    /// Without a merge operator, any batch containing a merge is rejected.
    pub fn with_merge_operator(merge_operator: Arc<dyn MergeOperator>) -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            merge_operator: Some(merge_operator),
        }
    }

    fn require_merge_operator(&self) -> StorageResult<&Arc<dyn MergeOperator>> {
        self.merge_operator.as_ref().ok_or_else(|| {
            StorageError::Storage(
                "Merge operator not configured: in-memory storage requires a merge operator to be set during construction".to_string(),
            )
        })
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_range(data: &BTreeMap<Bytes, Bytes>, range: &BytesRange) -> Vec<Record> {
    // BTreeMap::range panics on inverted bounds
    if range.is_empty() {
        return Vec::new();
    }
    data.range((range.start_bound().cloned(), range.end_bound().cloned()))
        .map(|(k, v)| Record::new(k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    /// Retrieves a single record by key from the in-memory store.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&key).map(|value| Record::new(key, value.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(InMemoryIterator::new(collect_range(&data, &range)))
    }
}

/// Iterator over records copied out of the map when the scan started.
struct InMemoryIterator {
    records: std::vec::IntoIter<Record>,
}

impl InMemoryIterator {
    fn new(records: Vec<Record>) -> Box<dyn StorageIterator + Send + 'static> {
        Box::new(Self {
            records: records.into_iter(),
        })
    }
}

#[async_trait]
impl StorageIterator for InMemoryIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(self.records.next())
    }
}

/// In-memory snapshot that holds a copy of the data at the time of snapshot creation.
pub struct InMemoryStorageSnapshot {
    data: Arc<BTreeMap<Bytes, Bytes>>,
}

#[async_trait]
impl StorageRead for InMemoryStorageSnapshot {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        Ok(self
            .data
            .get(&key)
            .map(|value| Record::new(key, value.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        Ok(InMemoryIterator::new(collect_range(&self.data, &range)))
    }
}

#[async_trait]
impl StorageSnapshot for InMemoryStorageSnapshot {}

#[async_trait]
impl Storage for InMemoryStorage {
    /// Applies the batch under one write lock acquisition.
    ///
    /// The batch is validated before the lock is taken, so a batch containing
    /// a merge without a configured merge operator leaves the store untouched.
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let merge_op = if ops.iter().any(|op| matches!(op, RecordOp::Merge(_))) {
            Some(Arc::clone(self.require_merge_operator()?))
        } else {
            None
        };

        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for op in ops {
            match op {
                RecordOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                RecordOp::Merge(record) => {
                    let Some(merge_op) = merge_op.as_ref() else {
                        return Err(StorageError::Internal(
                            "merge operator disappeared mid-batch".to_string(),
                        ));
                    };
                    let existing_value = data.get(&record.key).cloned();
                    let merged_value = merge_op.merge(&record.key, existing_value, record.value);
                    data.insert(record.key, merged_value);
                }
                RecordOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }

    /// Writes a batch of records to the in-memory store.
    ///
    /// For in-memory storage, write options are ignored since there is no
    /// durable storage to await.
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        self.apply(records.into_iter().map(RecordOp::Put).collect())
            .await
    }

    async fn snapshot(&self) -> StorageResult<Arc<dyn StorageSnapshot>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(Arc::new(InMemoryStorageSnapshot {
            data: Arc::new(data.clone()),
        }))
    }

    async fn flush(&self) -> StorageResult<()> {
        // All writes are immediately visible
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(StorageError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(StorageError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into `apply` (and therefore `put`/`merge`), `scan_iter`, `flush`
/// and `snapshot` on demand.
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let inner = Arc::new(InMemoryStorage::new());
/// let storage = FailingStorage::wrap(inner);
/// storage.fail_apply(StorageError::Storage("disk full".into()));
/// // every write now returns Err(...)
///
/// storage.fail_scan_once(StorageError::Storage("io error".into()));
/// // only the next scan returns Err(...), then auto-clears
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_apply: FailSlot,
    fail_scan: FailSlot,
    fail_flush: FailSlot,
    fail_snapshot: FailSlot,
}

#[cfg(feature = "test-utils")]
impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_apply: arc_swap::ArcSwap::from_pointee(None),
            fail_scan: arc_swap::ArcSwap::from_pointee(None),
            fail_flush: arc_swap::ArcSwap::from_pointee(None),
            fail_snapshot: arc_swap::ArcSwap::from_pointee(None),
        })
    }

    /// Makes every write return the given error.
    pub fn fail_apply(&self, err: StorageError) {
        self.fail_apply
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes the next write return the given error.
    pub fn fail_apply_once(&self, err: StorageError) {
        self.fail_apply.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes the next `scan_iter` return the given error.
    pub fn fail_scan_once(&self, err: StorageError) {
        self.fail_scan.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes the next `flush` return the given error.
    pub fn fail_flush_once(&self, err: StorageError) {
        self.fail_flush.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes the next `snapshot` return the given error.
    pub fn fail_snapshot_once(&self, err: StorageError) {
        self.fail_snapshot.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Clears every injected failure.
    pub fn clear(&self) {
        for slot in [
            &self.fail_apply,
            &self.fail_scan,
            &self.fail_flush,
            &self.fail_snapshot,
        ] {
            slot.store(Arc::new(None));
        }
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageRead for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        self.inner.get(key).await
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        check_failure(&self.fail_scan)?;
        self.inner.scan_iter(range).await
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Storage for FailingStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        check_failure(&self.fail_apply)?;
        self.inner.apply(ops).await
    }

    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        check_failure(&self.fail_apply)?;
        self.inner.put_with_options(records, options).await
    }

    async fn snapshot(&self) -> StorageResult<Arc<dyn StorageSnapshot>> {
        check_failure(&self.fail_snapshot)?;
        self.inner.snapshot().await
    }

    async fn flush(&self) -> StorageResult<()> {
        check_failure(&self.fail_flush)?;
        self.inner.flush().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}
