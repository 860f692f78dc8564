//! Configuration options for phrase table operations.

use std::path::Path;

use common::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::codec::{DEFAULT_INDEX_WIDTH, IndexCodec};
use crate::error::{Error, Result};

/// Configuration for opening a [`PhraseTable`](crate::PhraseTable).
///
/// # Example
///
/// ```toml
/// index_width = 5
///
/// [storage]
/// type = "SlateDb"
/// path = "ttable"
///
/// [storage.object_store]
/// type = "Local"
/// path = "/tmp/ttable"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Bytes per encoded word index. Bounds the largest storable index at
    /// `254^index_width - 1`; changing it for an existing table makes its
    /// keys unreadable.
    #[serde(default = "default_index_width")]
    pub index_width: usize,
}

fn default_index_width() -> usize {
    DEFAULT_INDEX_WIDTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            index_width: DEFAULT_INDEX_WIDTH,
        }
    }
}

impl Config {
    /// Reads a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))
    }

    /// Builds the index codec this configuration describes.
    pub fn codec(&self) -> Result<IndexCodec> {
        IndexCodec::new(self.index_width)
    }
}

/// Options for write operations.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// If true, waits for the write to be durable before returning.
    /// Default: false (returns after write is applied to memtable).
    pub await_durable: bool,
}
