//! Secondary indexing for partition/row-key table stores.
//!
//! Table stores in this family retrieve efficiently by exactly one compound
//! key, (partition key, row key); anything else is a scan. This crate layers
//! equality lookups over declared entity properties on top of such a store by
//! maintaining a companion index table per entity type. Each index row maps a
//! (property name, sanitized value) pair to the primary key of one entity
//! holding that value, so "all entities whose `Breed` is `Tabby`" becomes a
//! single-partition query on the index table followed by point gets.
//!
//! # Architecture
//!
//! - [`table_store::TableStore`] is the storage seam: get/put/delete/query
//!   against one table, implemented per backend.
//! - [`entity::TableEntity`] and [`entity::IndexedEntity`] describe an
//!   application type: its primary key and its statically declared indexed
//!   fields.
//! - [`key_encoding`] defines the serialized key forms shared by every index
//!   row, including value sanitization.
//! - [`index::IndexData`] reads and writes the index table.
//! - [`repository::SimpleIndexRepository`] orchestrates both tables and is
//!   the main entry point.
//!
//! Index maintenance is best-effort dual-write, not transactional; read
//! paths filter records whose entity has since disappeared.
//!
//! # Example
//!
//! ```no_run
//! use simple_index::{
//!     IndexedEntity, IndexedField, InMemoryTableStore, RepositoryOptions,
//!     SimpleIndexRepository, TableEntity,
//! };
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Cat {
//!     partition_key: String,
//!     row_key: String,
//!     breed: String,
//! }
//!
//! impl TableEntity for Cat {
//!     fn partition_key(&self) -> &str {
//!         &self.partition_key
//!     }
//!     fn row_key(&self) -> &str {
//!         &self.row_key
//!     }
//!     fn entity_name() -> &'static str {
//!         "Cat"
//!     }
//! }
//!
//! impl IndexedEntity for Cat {
//!     fn indexed_fields() -> &'static [IndexedField<Self>] {
//!         const FIELDS: &[IndexedField<Cat>] =
//!             &[IndexedField::new("Breed", |cat| Some(cat.breed.clone()))];
//!         FIELDS
//!     }
//! }
//!
//! # async fn run() -> simple_index::Result<()> {
//! let repo = SimpleIndexRepository::new(
//!     Arc::new(InMemoryTableStore::new()),
//!     Arc::new(InMemoryTableStore::new()),
//!     RepositoryOptions::default(),
//! );
//!
//! repo.add(&Cat {
//!     partition_key: "cats".into(),
//!     row_key: "1".into(),
//!     breed: "Tabby".into(),
//! })
//! .await?;
//!
//! let tabbies = repo.get_by_indexed_property("Breed", Some("Tabby")).await?;
//! assert_eq!(tabbies.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod index;
pub mod key_encoding;
pub mod options;
pub mod paging;
pub mod repository;
pub mod table_name;
pub mod table_store;
pub mod test_utils;

pub use entity::{IndexedEntity, IndexedField, TableEntity};
pub use error::{Error, Result};
pub use index::{IndexData, IndexRecord};
pub use key_encoding::{EntityKey, IndexKey, SEPARATOR};
pub use options::RepositoryOptions;
pub use paging::PagedResult;
pub use repository::{DanglingIndexHook, SimpleIndexRepository};
pub use table_name::{entity_table_name, index_table_name, table_name};
pub use table_store::{partition_key_filter, TableStore, TableStoreError};
pub use test_utils::InMemoryTableStore;
