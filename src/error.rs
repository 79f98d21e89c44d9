//! Crate-level error type for indexing and repository operations.
//!
//! Transport failures from the underlying table store are wrapped in
//! [`Error::Store`] and propagated without retrying. Everything else is a
//! logic error raised by this crate:
//!
//! - [`Error::InvalidArgument`]: a required parameter was blank
//! - [`Error::NotIndexed`] / [`Error::EntityNotFound`]: a bad call or bad
//!   state the caller can distinguish from transport trouble
//! - [`Error::NoMatches`] / [`Error::MultipleMatches`]: cardinality
//!   violations from the single/first lookup family

use crate::table_store::TableStoreError;
use thiserror::Error;

/// Result type for indexing and repository operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by index maintenance and resolution.
#[derive(Debug, Error)]
pub enum Error {
    /// A required parameter was empty or all whitespace.
    #[error("{0} must not be empty")]
    InvalidArgument(&'static str),

    /// The named property is not declared as indexed on the entity type.
    #[error("{property} is not an indexed property of {entity}")]
    NotIndexed {
        property: String,
        entity: &'static str,
    },

    /// The entity targeted by an update does not exist in the primary table.
    #[error("entity with partition key '{partition_key}' and row key '{row_key}' does not exist")]
    EntityNotFound {
        partition_key: String,
        row_key: String,
    },

    /// A single/first lookup matched no index records.
    #[error("the lookup matched no index records")]
    NoMatches,

    /// A single lookup matched more than one index record.
    #[error("the lookup matched more than one index record")]
    MultipleMatches,

    /// Transport error from the underlying table store.
    #[error(transparent)]
    Store(#[from] TableStoreError),
}
