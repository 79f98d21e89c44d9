//! Table store abstraction for pluggable storage implementations.
//!
//! The indexing engine never talks to a concrete storage service; it goes
//! through the [`TableStore`] trait, which models the minimal surface a
//! partition/row-key table service offers:
//!
//! - point get/put/delete addressed by (partition key, row key)
//! - filtered range query with page size and continuation-token pagination
//!
//! One `TableStore` handle is bound to one table. Versioning tags on writes
//! are always forced (last writer wins), so the trait collapses add/update
//! into a single unconditional [`put`](TableStore::put).
//!
//! ## Implementing a backend
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use simple_index::table_store::{Result, TableStore};
//!
//! pub struct MyBackend { /* connection/state */ }
//!
//! #[async_trait]
//! impl<T: TableEntity> TableStore<T> for MyBackend {
//!     async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<T>> {
//!         todo!()
//!     }
//!
//!     // ... implement the remaining methods
//! }
//! ```

use crate::entity::TableEntity;
use crate::paging::PagedResult;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for table store operations.
pub type Result<T> = std::result::Result<T, TableStoreError>;

/// Transport-level errors from a table store implementation.
///
/// These are propagated to callers unretried; retry and backoff policy
/// belongs to the store client itself.
#[derive(Debug, Clone, Error)]
pub enum TableStoreError {
    /// Generic I/O or service failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Entity could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Continuation token was not produced by this store or has expired.
    #[error("bad continuation token: {0}")]
    BadContinuationToken(String),

    /// Operation or filter shape not supported by this backend.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Other backend-specific errors.
    #[error("store error: {0}")]
    Other(String),
}

/// Renders the equality filter used to select all rows of one partition:
/// `PartitionKey eq '<value>'`.
///
/// This is the only filter template the index engine emits. The value is
/// interpolated verbatim; single quotes are not escaped.
pub fn partition_key_filter(value: impl std::fmt::Display) -> String {
    format!("PartitionKey eq '{}'", value)
}

/// Asynchronous access to one table of entities of type `T`.
///
/// Implementations must be safe for concurrent use; the engine holds a handle
/// as a long-lived shared resource and issues calls from many tasks.
#[async_trait]
pub trait TableStore<T: TableEntity>: Send + Sync {
    /// Retrieves an entity by its primary key.
    ///
    /// Not-found is a soft condition: returns `Ok(None)`, never an error.
    async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<T>>;

    /// Inserts or unconditionally replaces an entity (ignore version, force).
    async fn put(&self, entity: &T) -> Result<()>;

    /// Deletes an entity by its primary key, forcing past any version tag.
    ///
    /// Deleting a missing entity is a no-op, not an error.
    async fn delete(&self, partition_key: &str, row_key: &str) -> Result<()>;

    /// Runs a filtered range query, returning one page of matches.
    ///
    /// - `filter`: equality predicate in the store's filter syntax, or `None`
    ///   for the whole table. See [`partition_key_filter`].
    /// - `page_size`: maximum results in the page; `None` lets the store pick.
    /// - `continuation_token`: cursor from a previous page, `None` to start.
    ///
    /// A page may legally be smaller than `page_size` (even empty) while more
    /// results remain; callers must follow the token until it is `None`.
    async fn query(
        &self,
        filter: Option<&str>,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<T>>;
}
