//! SlateDB-backed implementation of the [`Storage`] traits.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::config::WriteOptions as SlateWriteOptions;
use slatedb::{Db, DbIterator, DbSnapshot, WriteBatch};

use super::{
    MergeOperator, Record, RecordOp, Storage, StorageError, StorageIterator, StorageRead,
    StorageResult, StorageSnapshot, WriteOptions,
};
use crate::BytesRange;

/// Storage backed by a SlateDB database.
pub struct SlateDbStorage {
    db: Arc<Db>,
}

impl SlateDbStorage {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Wraps a workspace merge operator so SlateDB can call it during reads
    /// and compaction.
    pub fn merge_operator_adapter(op: Arc<dyn MergeOperator>) -> SlateDbMergeOperatorAdapter {
        SlateDbMergeOperatorAdapter { operator: op }
    }

    fn batch(ops: Vec<RecordOp>) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                RecordOp::Put(record) => batch.put(record.key, record.value),
                RecordOp::Merge(record) => batch.merge(record.key, record.value),
                RecordOp::Delete(key) => batch.delete(key),
            }
        }
        batch
    }
}

pub struct SlateDbMergeOperatorAdapter {
    operator: Arc<dyn MergeOperator>,
}

impl slatedb::MergeOperator for SlateDbMergeOperatorAdapter {
    fn merge(
        &self,
        key: &Bytes,
        existing_value: Option<Bytes>,
        value: Bytes,
    ) -> Result<Bytes, slatedb::MergeOperatorError> {
        Ok(self.operator.merge(key, existing_value, value))
    }
}

struct SlateDbIterator {
    inner: DbIterator,
}

#[async_trait]
impl StorageIterator for SlateDbIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        let entry = self
            .inner
            .next()
            .await
            .map_err(StorageError::from_storage)?;
        Ok(entry.map(|kv| Record::new(kv.key, kv.value)))
    }
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let inner = self
            .db
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { inner }))
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        self.db
            .write(Self::batch(ops))
            .await
            .map_err(StorageError::from_storage)
    }

    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let batch = Self::batch(records.into_iter().map(RecordOp::Put).collect());
        let slate_options = SlateWriteOptions {
            await_durable: options.await_durable,
        };
        self.db
            .write_with_options(batch, &slate_options)
            .await
            .map_err(StorageError::from_storage)
    }

    async fn snapshot(&self) -> StorageResult<Arc<dyn StorageSnapshot>> {
        let snapshot = self
            .db
            .snapshot()
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Arc::new(SlateDbStorageSnapshot { snapshot }))
    }

    async fn flush(&self) -> StorageResult<()> {
        self.db.flush().await.map_err(StorageError::from_storage)
    }

    async fn close(&self) -> StorageResult<()> {
        self.db.close().await.map_err(StorageError::from_storage)
    }
}

/// Point-in-time view over a SlateDB database.
pub struct SlateDbStorageSnapshot {
    snapshot: Arc<DbSnapshot>,
}

#[async_trait]
impl StorageRead for SlateDbStorageSnapshot {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .snapshot
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let inner = self
            .snapshot
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { inner }))
    }
}

#[async_trait]
impl StorageSnapshot for SlateDbStorageSnapshot {}
