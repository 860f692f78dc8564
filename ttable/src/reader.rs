//! Read-only phrase table access and the [`PhraseTableRead`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use common::StorageRead;

use crate::codec::IndexCodec;
use crate::error::Result;
use crate::key::PhraseKey;
use crate::model::{Count, EncodedKey, Phrase};
use crate::query;
use crate::storage::CountStorageRead;

/// Trait for read operations on the phrase table.
///
/// This trait defines the common read interface shared by both
/// [`PhraseTable`](crate::PhraseTable) and [`PhraseTableReader`].
#[async_trait]
pub trait PhraseTableRead: Send + Sync {
    /// Returns the count stored under an encoded key, or zero if the key was
    /// never incremented.
    async fn get(&self, key: &EncodedKey) -> Result<Count>;

    /// Returns the count of a tagged key.
    async fn count(&self, key: &PhraseKey) -> Result<Count>;

    /// Counts the distinct source phrases recorded with `target`.
    async fn count_sources_for_target(&self, target: &Phrase) -> Result<u64>;

    /// Lists the source phrases recorded with `target` and their joint
    /// counts, in key order.
    async fn sources_for_target(&self, target: &Phrase) -> Result<Vec<(Phrase, Count)>>;

    async fn source_count(&self, source: &Phrase) -> Result<Count> {
        self.count(&PhraseKey::Source(source.clone())).await
    }

    async fn target_count(&self, target: &Phrase) -> Result<Count> {
        self.count(&PhraseKey::Target(target.clone())).await
    }

    async fn joint_count(&self, target: &Phrase, source: &Phrase) -> Result<Count> {
        self.count(&PhraseKey::joint(target.clone(), source.clone()))
            .await
    }
}

/// A read-only view of the phrase table.
///
/// `PhraseTableReader` provides access to all read operations via the
/// [`PhraseTableRead`] trait, but not write operations. Readers taken with
/// [`PhraseTable::snapshot`](crate::PhraseTable::snapshot) see the table as
/// of the moment the snapshot was taken.
#[derive(Clone)]
pub struct PhraseTableReader {
    storage: CountStorageRead,
    codec: IndexCodec,
}

impl PhraseTableReader {
    /// Creates a reader over any storage holding phrase table counts.
    ///
    /// The codec must match the one the table was written with.
    pub fn new(storage: Arc<dyn StorageRead>, codec: IndexCodec) -> Self {
        Self::from_count_storage(CountStorageRead::new(storage), codec)
    }

    pub(crate) fn from_count_storage(storage: CountStorageRead, codec: IndexCodec) -> Self {
        Self { storage, codec }
    }

    pub fn codec(&self) -> &IndexCodec {
        &self.codec
    }
}

#[async_trait]
impl PhraseTableRead for PhraseTableReader {
    async fn get(&self, key: &EncodedKey) -> Result<Count> {
        self.storage.get(key).await
    }

    async fn count(&self, key: &PhraseKey) -> Result<Count> {
        let encoded = key.encode(&self.codec)?;
        self.storage.get(&encoded).await
    }

    async fn count_sources_for_target(&self, target: &Phrase) -> Result<u64> {
        query::count_sources_for_target(&self.storage, &self.codec, target).await
    }

    async fn sources_for_target(&self, target: &Phrase) -> Result<Vec<(Phrase, Count)>> {
        query::sources_for_target(&self.storage, &self.codec, target).await
    }
}
