//! Entity traits and static indexed-field descriptors.
//!
//! Instead of runtime attribute scanning, the set of indexed properties is
//! declared statically per entity type: each [`IndexedEntity`] supplies a
//! slice of [`IndexedField`] descriptors, resolved at compile time. The
//! descriptor pairs a property name with an accessor function, which is all
//! the index engine needs to fan writes out.
//!
//! ## Example
//!
//! ```rust,ignore
//! use serde::{Deserialize, Serialize};
//! use simple_index::{IndexedEntity, IndexedField, TableEntity};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Cat {
//!     partition_key: String,
//!     row_key: String,
//!     breed: String,
//!     name: String,
//! }
//!
//! impl TableEntity for Cat {
//!     fn partition_key(&self) -> &str { &self.partition_key }
//!     fn row_key(&self) -> &str { &self.row_key }
//!     fn entity_name() -> &'static str { "Cat" }
//! }
//!
//! impl IndexedEntity for Cat {
//!     fn indexed_fields() -> &'static [IndexedField<Self>] {
//!         &[IndexedField::new("Breed", |cat| Some(cat.breed.clone()))]
//!     }
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity addressable by the store's two-part primary key.
///
/// Serialization bounds are part of the contract because the table store
/// persists entities as property bags; how bytes are produced is the store
/// implementation's concern.
pub trait TableEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The partition key of this entity in the primary table.
    fn partition_key(&self) -> &str;

    /// The row key of this entity in the primary table.
    fn row_key(&self) -> &str;

    /// The logical name of this entity type, used to derive table names.
    ///
    /// Override the value to store the entity under a different table name
    /// than the type's own.
    fn entity_name() -> &'static str;
}

/// Descriptor for one indexed property of an entity type.
///
/// The accessor returns the property's current value as a string, or `None`
/// when the property is unset; `None` indexes as the empty string. Non-string
/// properties should be rendered through their display conversion by the
/// accessor.
pub struct IndexedField<T> {
    /// Property name as it appears in index record partition keys.
    pub name: &'static str,
    /// Extracts the property's current value from an entity.
    pub get: fn(&T) -> Option<String>,
}

impl<T> IndexedField<T> {
    /// Creates a descriptor from a property name and accessor.
    pub const fn new(name: &'static str, get: fn(&T) -> Option<String>) -> Self {
        Self { name, get }
    }

    /// Returns the entity's current value for this field, with `None`
    /// converted to the empty string.
    pub fn value_of(&self, entity: &T) -> String {
        (self.get)(entity).unwrap_or_default()
    }
}

impl<T> Clone for IndexedField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IndexedField<T> {}

impl<T> std::fmt::Debug for IndexedField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedField").field("name", &self.name).finish()
    }
}

/// An entity type with a statically-declared set of indexed properties.
///
/// Types with an empty descriptor slice participate in the repository like
/// any other entity; index maintenance simply becomes a no-op for them.
pub trait IndexedEntity: TableEntity + Sized {
    /// The ordered set of properties maintained in this type's index table.
    fn indexed_fields() -> &'static [IndexedField<Self>];

    /// Looks up a descriptor by property name.
    fn indexed_field(name: &str) -> Option<&'static IndexedField<Self>> {
        Self::indexed_fields().iter().find(|field| field.name == name)
    }

    /// Whether any property of this type is indexed.
    fn has_indexed_fields() -> bool {
        !Self::indexed_fields().is_empty()
    }
}
