//! Count-level wrappers over the raw storage traits.
//!
//! [`CountStorage`] and [`CountStorageRead`] translate between encoded keys
//! with `u64` counts and the byte records of [`common::Storage`].

use std::sync::Arc;

use bytes::Bytes;
use common::{BytesRange, Record, RecordOp, Storage, StorageIterator, StorageRead};

use crate::config::WriteOptions;
use crate::error::{Error, Result};
use crate::model::{Count, EncodedKey};
use crate::serde::{decode_count, encode_count};

/// Read-only count operations.
#[derive(Clone)]
pub(crate) struct CountStorageRead {
    storage: Arc<dyn StorageRead>,
}

impl CountStorageRead {
    pub(crate) fn new(storage: Arc<dyn StorageRead>) -> Self {
        Self { storage }
    }

    /// Returns the stored count, or zero if the key was never incremented.
    pub(crate) async fn get(&self, key: &EncodedKey) -> Result<Count> {
        let record = self
            .storage
            .get(key.as_bytes().clone())
            .await
            .map_err(Error::from)?;
        match record {
            Some(record) => decode_count(&record.value),
            None => Ok(0),
        }
    }

    /// Scans counts in ascending key order.
    pub(crate) async fn scan(&self, range: BytesRange) -> Result<CountScanIterator> {
        let inner = self.storage.scan_iter(range).await.map_err(Error::from)?;
        Ok(CountScanIterator { inner })
    }
}

/// Iterator over `(key, count)` entries from storage.
pub(crate) struct CountScanIterator {
    inner: Box<dyn StorageIterator + Send>,
}

impl CountScanIterator {
    /// Returns the next entry without decoding its value.
    pub(crate) async fn next_key(&mut self) -> Result<Option<Bytes>> {
        let record = self.inner.next().await.map_err(Error::from)?;
        Ok(record.map(|r| r.key))
    }

    /// Returns the next entry, or None if iteration is complete.
    pub(crate) async fn next(&mut self) -> Result<Option<(Bytes, Count)>> {
        match self.inner.next().await.map_err(Error::from)? {
            Some(Record { key, value }) => Ok(Some((key, decode_count(&value)?))),
            None => Ok(None),
        }
    }
}

/// Read-write count operations.
#[derive(Clone)]
pub(crate) struct CountStorage {
    storage: Arc<dyn Storage>,
}

impl CountStorage {
    /// Wraps a storage opened with [`CountMergeOperator`](crate::CountMergeOperator).
    pub(crate) fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates a new storage with an in-memory backend.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        use common::storage::in_memory::InMemoryStorage;
        Self::new(Arc::new(InMemoryStorage::with_merge_operator(Arc::new(
            crate::CountMergeOperator,
        ))))
    }

    /// Returns a read-only view of this storage.
    pub(crate) fn as_read(&self) -> CountStorageRead {
        CountStorageRead::new(Arc::clone(&self.storage) as Arc<dyn StorageRead>)
    }

    /// Returns a read-only view of a point-in-time snapshot.
    pub(crate) async fn snapshot(&self) -> Result<CountStorageRead> {
        let snapshot = self.storage.snapshot().await.map_err(Error::from)?;
        Ok(CountStorageRead::new(snapshot as Arc<dyn StorageRead>))
    }

    /// Adds every `(key, delta)` pair in one atomic batch.
    ///
    /// Deltas for the same key may repeat; the merge operator sums them.
    pub(crate) async fn increment_all(
        &self,
        increments: Vec<(EncodedKey, Count)>,
        options: &WriteOptions,
    ) -> Result<()> {
        if increments.is_empty() {
            return Ok(());
        }
        let ops = increments
            .into_iter()
            .map(|(key, delta)| Record::new(key.into_bytes(), encode_count(delta)))
            .map(RecordOp::Merge)
            .collect();

        // common::Storage::apply has no options variant, so durability is
        // awaited with an explicit flush.
        self.storage.apply(ops).await.map_err(Error::from)?;
        if options.await_durable {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flushes pending writes to durable storage.
    pub(crate) async fn flush(&self) -> Result<()> {
        self.storage.flush().await.map_err(Error::from)
    }

    /// Closes the storage, releasing resources.
    pub(crate) async fn close(&self) -> Result<()> {
        self.storage.close().await.map_err(Error::from)
    }
}
