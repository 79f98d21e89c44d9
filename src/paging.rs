//! Pagination envelope shared by index and entity queries.

use serde::{Deserialize, Serialize};

/// One page of query results plus the opaque cursor for resuming.
///
/// A `None` token means enumeration is complete. The token format is owned by
/// the table store that produced it; callers only pass it back verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Cursor to pass to the next page request, absent on the last page.
    pub continuation_token: Option<String>,
    /// The results in this page, in store enumeration order.
    pub results: Vec<T>,
}

impl<T> PagedResult<T> {
    /// Creates a page from its parts.
    pub fn new(results: Vec<T>, continuation_token: Option<String>) -> Self {
        Self {
            continuation_token,
            results,
        }
    }

    /// The empty page: no results, no token.
    pub fn empty() -> Self {
        Self {
            continuation_token: None,
            results: Vec::new(),
        }
    }

    /// Whether this page ends the enumeration.
    pub fn is_final(&self) -> bool {
        self.continuation_token.is_none()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}
