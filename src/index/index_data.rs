//! Data access for one entity type's index table.

use crate::entity::{IndexedEntity, IndexedField};
use crate::error::{Error, Result};
use crate::index::record::IndexRecord;
use crate::key_encoding::{EntityKey, IndexKey};
use crate::paging::PagedResult;
use crate::table_store::{partition_key_filter, TableStore};
use std::marker::PhantomData;
use std::sync::Arc;

/// CRUD and lookup operations against the index table for entity type `T`.
///
/// When `T` declares no indexed fields there is no index table to maintain:
/// the store handle is dropped at construction and every write becomes a
/// no-op, every read an empty result.
///
/// All operations are single store round-trips (or a token-following loop for
/// the unpaged reads); transport errors propagate to the caller unretried.
pub struct IndexData<T: IndexedEntity> {
    store: Option<Arc<dyn TableStore<IndexRecord>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IndexedEntity> IndexData<T> {
    /// Creates the index data access for `T` over the given index table.
    ///
    /// The handle is discarded when `T` has no indexed fields.
    pub fn new(store: Arc<dyn TableStore<IndexRecord>>) -> Self {
        Self {
            store: T::has_indexed_fields().then_some(store),
            _marker: PhantomData,
        }
    }

    /// Whether this instance is backed by an index table at all.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn record_for(entity: &T, field: &IndexedField<T>) -> IndexRecord {
        let index_key = IndexKey::new(field.name, &field.value_of(entity));
        IndexRecord::new(&index_key, &EntityKey::from_entity(entity))
    }

    /// Persists the index record for one field of `entity`, derived from the
    /// field's current value.
    pub async fn add(&self, entity: &T, field: &IndexedField<T>) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = Self::record_for(entity, field);
        store.put(&record).await?;
        Ok(())
    }

    /// Deletes the index record derived from `entity`'s current value of one
    /// field.
    ///
    /// The record addressed is computed from the entity as passed in; to
    /// remove a stale record, pass the entity state that produced it.
    pub async fn delete(&self, entity: &T, field: &IndexedField<T>) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = Self::record_for(entity, field);
        store.delete(&record.partition_key, &record.row_key).await?;
        Ok(())
    }

    /// Swaps the index record for one field: deletes the record derived from
    /// `old_entity`, then adds the record derived from `new_entity`.
    ///
    /// Two independent store calls with no transaction; a failure between
    /// them leaves the field unindexed until the next successful write.
    pub async fn replace(
        &self,
        old_entity: &T,
        new_entity: &T,
        field: &IndexedField<T>,
    ) -> Result<()> {
        self.delete(old_entity, field).await?;
        self.add(new_entity, field).await
    }

    /// Returns every index record whose partition key matches `index_key`,
    /// following continuation tokens to exhaustion.
    pub async fn get_all_indexes(&self, index_key: &IndexKey) -> Result<Vec<IndexRecord>> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };

        let filter = partition_key_filter(index_key);
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = store.query(Some(&filter), None, token.as_deref()).await?;
            records.extend(page.results);
            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(records)
    }

    /// Returns the first matching record in store enumeration order, or
    /// `None` when there is no match.
    pub async fn get_first_index_or_default(
        &self,
        index_key: &IndexKey,
    ) -> Result<Option<IndexRecord>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let filter = partition_key_filter(index_key);
        let mut token: Option<String> = None;
        // A page may be empty while more results remain; keep following the
        // token until a record shows up or enumeration ends.
        loop {
            let page = store.query(Some(&filter), Some(1), token.as_deref()).await?;
            if let Some(record) = page.results.into_iter().next() {
                return Ok(Some(record));
            }
            match page.continuation_token {
                Some(next) => token = Some(next),
                None => return Ok(None),
            }
        }
    }

    /// Returns the first matching record, failing with [`Error::NoMatches`]
    /// when there is none.
    pub async fn get_first_index(&self, index_key: &IndexKey) -> Result<IndexRecord> {
        self.get_first_index_or_default(index_key)
            .await?
            .ok_or(Error::NoMatches)
    }

    /// Returns the only matching record.
    ///
    /// # Errors
    ///
    /// [`Error::NoMatches`] on zero matches, [`Error::MultipleMatches`] on
    /// two or more.
    pub async fn get_single_index(&self, index_key: &IndexKey) -> Result<IndexRecord> {
        match self.get_single_index_or_default(index_key).await? {
            Some(record) => Ok(record),
            None => Err(Error::NoMatches),
        }
    }

    /// Returns the only matching record, or `None` on zero matches.
    ///
    /// # Errors
    ///
    /// [`Error::MultipleMatches`] on two or more matches.
    pub async fn get_single_index_or_default(
        &self,
        index_key: &IndexKey,
    ) -> Result<Option<IndexRecord>> {
        let mut records = self.get_all_indexes(index_key).await?;
        if records.len() > 1 {
            return Err(Error::MultipleMatches);
        }
        Ok(records.pop())
    }

    /// Returns one page of matching records plus the token for resuming.
    pub async fn page_indexes(
        &self,
        index_key: &IndexKey,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<IndexRecord>> {
        let Some(store) = &self.store else {
            return Ok(PagedResult::empty());
        };

        let filter = partition_key_filter(index_key);
        let page = store
            .query(Some(&filter), page_size, continuation_token)
            .await?;
        Ok(page)
    }
}
