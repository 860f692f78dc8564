//! Storage plumbing shared by the ttable workspace.
//!
//! The [`Storage`] traits describe the sorted key-value store the phrase count
//! table is built on: point reads, ordered range scans, atomic write batches
//! mixing puts, merges and deletes, and point-in-time snapshots. Two backends
//! are provided, an in-memory `BTreeMap` and SlateDB on an object store.

pub mod bytes;
pub mod storage;

pub use bytes::BytesRange;
pub use storage::config::StorageConfig;
pub use storage::{
    MergeOperator, Record, RecordOp, Storage, StorageError, StorageIterator, StorageRead,
    StorageResult, StorageSnapshot, WriteOptions,
};
