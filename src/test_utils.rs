//! Test utilities.
//!
//! Provides [`InMemoryTableStore`], an in-process [`TableStore`] backing for
//! tests in this crate and in dependent crates. Entities round-trip through
//! JSON bytes so the store behaves like a remote service: reads return
//! decoded copies, never aliases of what was written.

use crate::entity::TableEntity;
use crate::paging::PagedResult;
use crate::table_store::{Result, TableStore, TableStoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory table keyed by (partition key, row key), enumerated in key
/// order.
///
/// Continuation tokens are offsets into the filtered enumeration and are only
/// stable while the table is not mutated — good enough for a test double.
/// Operation counters record how many calls of each kind the store has
/// served, so tests can assert on write traffic, not just on final state.
pub struct InMemoryTableStore<T> {
    rows: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
    queries: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InMemoryTableStore<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            gets: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            queries: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Point gets served so far.
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Puts served so far.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Deletes served so far.
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Queries served so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl<T> Default for InMemoryTableStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the partition-key value from the one filter shape the engine
/// emits: `PartitionKey eq '<value>'`. `None` filters match everything.
fn parse_partition_key_filter(filter: &str) -> Result<String> {
    filter
        .strip_prefix("PartitionKey eq '")
        .and_then(|rest| rest.strip_suffix('\''))
        .map(str::to_owned)
        .ok_or_else(|| TableStoreError::Unsupported(format!("filter not understood: {}", filter)))
}

fn encode<T: TableEntity>(entity: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(entity).map_err(|e| TableStoreError::Serialization(e.to_string()))
}

fn decode<T: TableEntity>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| TableStoreError::Serialization(e.to_string()))
}

#[async_trait]
impl<T: TableEntity> TableStore<T> for InMemoryTableStore<T> {
    async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<T>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows.read();
        match rows.get(&(partition_key.to_owned(), row_key.to_owned())) {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, entity: &T) -> Result<()> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        let bytes = encode(entity)?;
        let key = (entity.partition_key().to_owned(), entity.row_key().to_owned());
        self.rows.write().insert(key, bytes);
        Ok(())
    }

    async fn delete(&self, partition_key: &str, row_key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.rows
            .write()
            .remove(&(partition_key.to_owned(), row_key.to_owned()));
        Ok(())
    }

    async fn query(
        &self,
        filter: Option<&str>,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<T>> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let wanted_partition = filter.map(parse_partition_key_filter).transpose()?;
        let offset: usize = match continuation_token {
            Some(token) => token
                .parse()
                .map_err(|_| TableStoreError::BadContinuationToken(token.to_owned()))?,
            None => 0,
        };

        let rows = self.rows.read();
        let matches: Vec<T> = rows
            .iter()
            .filter(|((pk, _), _)| wanted_partition.as_deref().map_or(true, |w| w == pk.as_str()))
            .map(|(_, bytes)| decode(bytes))
            .collect::<Result<_>>()?;

        let total = matches.len();
        let page: Vec<T> = match page_size {
            Some(n) => matches.into_iter().skip(offset).take(n).collect(),
            None => matches.into_iter().skip(offset).collect(),
        };

        let consumed = offset + page.len();
        let continuation_token = (consumed < total).then(|| consumed.to_string());
        Ok(PagedResult::new(page, continuation_token))
    }
}
