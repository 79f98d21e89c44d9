//! The persisted index record.

use crate::entity::TableEntity;
use crate::key_encoding::{EntityKey, IndexKey};
use serde::{Deserialize, Serialize};

/// One row of an index table, mapping a (property name, property value) pair
/// to the primary key of the entity carrying that value.
///
/// The record is its own encoding: its partition key is the serialized
/// [`IndexKey`] and its row key is the serialized [`EntityKey`]. Neither key
/// is stored separately — [`index_key`](Self::index_key) and
/// [`entity_key`](Self::entity_key) decode the stored strings on every call,
/// so there is no cached state to go stale.
///
/// Many records may share one partition key: one per entity whose indexed
/// property currently holds that value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Serialized [`IndexKey`] of the indexed property value.
    pub partition_key: String,
    /// Serialized [`EntityKey`] of the owning entity.
    pub row_key: String,
}

impl IndexRecord {
    /// Builds the record for an (index key, entity key) pair.
    pub fn new(index_key: &IndexKey, entity_key: &EntityKey) -> Self {
        Self {
            partition_key: index_key.to_string(),
            row_key: entity_key.to_string(),
        }
    }

    /// Decodes the index key from the stored partition key.
    ///
    /// `None` when the stored string is corrupt.
    pub fn index_key(&self) -> Option<IndexKey> {
        IndexKey::from_string(&self.partition_key)
    }

    /// Decodes the entity key from the stored row key.
    ///
    /// `None` when the stored string is corrupt.
    pub fn entity_key(&self) -> Option<EntityKey> {
        EntityKey::from_string(&self.row_key)
    }
}

impl TableEntity for IndexRecord {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }

    fn row_key(&self) -> &str {
        &self.row_key
    }

    fn entity_name() -> &'static str {
        "Index"
    }
}
