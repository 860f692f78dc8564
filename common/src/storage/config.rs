//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Selects and configures the storage backend.
///
/// ```toml
/// [storage]
/// type = "SlateDb"
/// path = "ttable"
/// settings_path = "slatedb.toml"
///
/// [storage.object_store]
/// type = "Local"
/// path = "/var/lib/ttable"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Volatile `BTreeMap` storage, for tests and dry runs.
    #[default]
    InMemory,
    /// SlateDB on an object store.
    SlateDb(SlateDbStorageConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlateDbStorageConfig {
    /// Path prefix of the database inside the object store.
    pub path: String,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Optional SlateDB settings file (bloom filter bits, memtable size, ...).
    /// SlateDB's own environment/default lookup is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    #[default]
    InMemory,
    Local(LocalObjectStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectStoreConfig {
    /// Root directory; created if missing.
    pub path: String,
}
