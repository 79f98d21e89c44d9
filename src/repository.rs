//! Indexed repository — dual-write orchestration between the primary entity
//! table and its index table.
//!
//! ## Write paths
//!
//! ```text
//! add(entity)
//!     1. put entity                      (primary table)
//!     2. put one index record per field  (index table, sequential)
//!
//! update(entity)
//!     1. point-get stored entity         (must exist)
//!     2. replace index records for fields whose value changed
//!     3. put entity, last writer wins
//!
//! delete(entity)
//!     1. delete one index record per field
//!     2. delete entity
//! ```
//!
//! There is no cross-table transaction: a crash inside any sequence leaves
//! either an under-indexed entity (add) or dangling index records (delete).
//! Read paths tolerate both — a dangling record resolves to a missing entity
//! and is filtered out of results, observable through the optional
//! dangling-index hook.
//!
//! ## Read-by-index paths
//!
//! Lookups resolve an [`IndexKey`], fetch the matching [`IndexRecord`]s, and
//! turn each into an entity with a point get against the primary table. Many
//! small point gets beat one large disjunctive filter on this class of store,
//! so batch resolution is a loop of gets, not a combined query.

use crate::entity::IndexedEntity;
use crate::error::{Error, Result};
use crate::index::index_data::IndexData;
use crate::index::record::IndexRecord;
use crate::key_encoding::IndexKey;
use crate::options::RepositoryOptions;
use crate::paging::PagedResult;
use crate::table_store::{partition_key_filter, TableStore};
use std::fmt;
use std::sync::Arc;

/// Callback invoked for each dangling index record filtered out during
/// resolution.
pub type DanglingIndexHook = Arc<dyn Fn(&IndexRecord) + Send + Sync>;

/// Repository over one entity type, keeping the primary table and the index
/// table mutually consistent across create/update/delete and resolving
/// lookups by indexed property.
///
/// Holds no in-memory state between calls; the durable tables are the state.
/// Safe for concurrent use to the extent the underlying store handles are,
/// though concurrent updates of one entity can interleave their
/// read-diff-write sequences (last writer wins, per table).
pub struct SimpleIndexRepository<T: IndexedEntity> {
    table: Arc<dyn TableStore<T>>,
    index_data: IndexData<T>,
    options: RepositoryOptions,
    on_dangling_index: Option<DanglingIndexHook>,
}

impl<T: IndexedEntity> SimpleIndexRepository<T> {
    /// Creates a repository over the entity table and the index table for `T`.
    pub fn new(
        table: Arc<dyn TableStore<T>>,
        index_store: Arc<dyn TableStore<IndexRecord>>,
        options: RepositoryOptions,
    ) -> Self {
        Self {
            table,
            index_data: IndexData::new(index_store),
            options,
            on_dangling_index: None,
        }
    }

    /// Installs a callback fired once per dangling index record filtered out
    /// at resolution time.
    pub fn with_dangling_index_hook(
        mut self,
        hook: impl Fn(&IndexRecord) + Send + Sync + 'static,
    ) -> Self {
        self.on_dangling_index = Some(Arc::new(hook));
        self
    }

    /// The index data access for `T`.
    pub fn index_data(&self) -> &IndexData<T> {
        &self.index_data
    }

    /// The repository's configuration.
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Persists `entity`, then one index record per indexed field.
    ///
    /// Entity first, indexes second: a failure partway leaves the entity
    /// point-gettable but under-indexed until the next successful write.
    pub async fn add(&self, entity: &T) -> Result<()> {
        self.table.put(entity).await?;

        for field in T::indexed_fields() {
            self.index_data.add(entity, field).await?;
        }
        Ok(())
    }

    /// Deletes every index record for `entity`'s indexed fields, then the
    /// entity itself.
    ///
    /// Indexes first, entity second: a failure partway leaves dangling index
    /// records, resolved lazily (filtered) at read time.
    pub async fn delete(&self, entity: &T) -> Result<()> {
        for field in T::indexed_fields() {
            self.index_data.delete(entity, field).await?;
        }

        self.table
            .delete(entity.partition_key(), entity.row_key())
            .await?;
        Ok(())
    }

    /// Updates `entity`, replacing index records only for indexed fields
    /// whose value actually changed, then overwrites the entity
    /// unconditionally (last writer wins).
    ///
    /// # Errors
    ///
    /// [`Error::EntityNotFound`] when no stored entity exists under
    /// `entity`'s primary key.
    pub async fn update(&self, entity: &T) -> Result<()> {
        let existing = self
            .get(entity.partition_key(), entity.row_key())
            .await?
            .ok_or_else(|| Error::EntityNotFound {
                partition_key: entity.partition_key().to_owned(),
                row_key: entity.row_key().to_owned(),
            })?;

        let mut replaced = 0u32;
        for field in T::indexed_fields() {
            if field.value_of(&existing) != field.value_of(entity) {
                self.index_data.replace(&existing, entity, field).await?;
                replaced += 1;
            }
        }
        if replaced > 0 {
            log::debug!(
                "update of {} {}/{} replaced {} index record(s)",
                T::entity_name(),
                entity.partition_key(),
                entity.row_key(),
                replaced
            );
        }

        self.table.put(entity).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Primary-table reads
    // ------------------------------------------------------------------

    /// Retrieves one entity by primary key; `Ok(None)` when absent.
    pub async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<T>> {
        Ok(self.table.get(partition_key, row_key).await?)
    }

    /// Retrieves every entity in the table.
    pub async fn get_all(&self) -> Result<Vec<T>> {
        self.drain_query(None).await
    }

    /// Retrieves every entity under one partition key.
    pub async fn get_by_partition(&self, partition_key: &str) -> Result<Vec<T>> {
        let filter = partition_key_filter(partition_key);
        self.drain_query(Some(&filter)).await
    }

    /// Runs an arbitrary filter against the primary table, draining all
    /// pages.
    pub async fn query(&self, filter: &str) -> Result<Vec<T>> {
        self.drain_query(Some(filter)).await
    }

    /// One page of an arbitrary filter against the primary table.
    pub async fn paged_query(
        &self,
        filter: Option<&str>,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<T>> {
        let page_size = page_size.or(Some(self.options.default_page_size));
        let page = self
            .table
            .query(filter, page_size, continuation_token)
            .await?;
        Ok(page)
    }

    /// One page of the whole table.
    pub async fn page(
        &self,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<T>> {
        self.paged_query(None, page_size, continuation_token).await
    }

    /// One page of one partition.
    pub async fn page_by_partition(
        &self,
        partition_key: &str,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<T>> {
        let filter = partition_key_filter(partition_key);
        self.paged_query(Some(&filter), page_size, continuation_token)
            .await
    }

    async fn drain_query(&self, filter: Option<&str>) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.table.query(filter, None, token.as_deref()).await?;
            results.extend(page.results);
            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Index resolution
    // ------------------------------------------------------------------

    /// Resolves the index key for a named property of `T`, validating that
    /// the property is indexed. `None` values index as the empty string.
    pub fn index_key_for<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
    ) -> Result<IndexKey> {
        IndexKey::for_property::<T, V>(property_name, property_value)
    }

    /// Retrieves every entity whose indexed property currently matches
    /// `property_value`.
    ///
    /// No matching index records yields an empty vector, not an error.
    /// Records whose entity no longer exists are filtered out.
    pub async fn get_by_indexed_property<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
    ) -> Result<Vec<T>> {
        let index_key = self.index_key_for(property_name, property_value)?;
        let records = self.index_data.get_all_indexes(&index_key).await?;
        self.get_by_indexes(&records).await
    }

    /// One page of entities matching an indexed property value.
    ///
    /// The continuation token is the index table's token; entities filtered
    /// out as dangling can make a page smaller than requested.
    pub async fn page_by_indexed_property<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
        page_size: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<PagedResult<T>> {
        let index_key = self.index_key_for(property_name, property_value)?;
        let page_size = page_size.or(Some(self.options.default_page_size));
        let page = self
            .index_data
            .page_indexes(&index_key, page_size, continuation_token)
            .await?;

        let results = self.get_by_indexes(&page.results).await?;
        Ok(PagedResult::new(results, page.continuation_token))
    }

    /// Resolves the only entity matching an indexed property value.
    ///
    /// Inherits [`IndexData::get_single_index`] cardinality errors; a
    /// dangling match resolves to `Ok(None)`.
    pub async fn get_single_by_indexed_property<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
    ) -> Result<Option<T>> {
        let index_key = self.index_key_for(property_name, property_value)?;
        let record = self.index_data.get_single_index(&index_key).await?;
        self.resolve(&record).await
    }

    /// Like [`get_single_by_indexed_property`](Self::get_single_by_indexed_property),
    /// but zero matches yields `Ok(None)` instead of an error.
    pub async fn get_single_or_default_by_indexed_property<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
    ) -> Result<Option<T>> {
        let index_key = self.index_key_for(property_name, property_value)?;
        match self.index_data.get_single_index_or_default(&index_key).await? {
            Some(record) => self.resolve(&record).await,
            None => Ok(None),
        }
    }

    /// Resolves the first entity matching an indexed property value, in
    /// store enumeration order.
    ///
    /// # Errors
    ///
    /// [`Error::NoMatches`] when no index record matches.
    pub async fn get_first_by_indexed_property<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
    ) -> Result<Option<T>> {
        let index_key = self.index_key_for(property_name, property_value)?;
        let record = self.index_data.get_first_index(&index_key).await?;
        self.resolve(&record).await
    }

    /// Like [`get_first_by_indexed_property`](Self::get_first_by_indexed_property),
    /// but zero matches yields `Ok(None)` instead of an error.
    pub async fn get_first_or_default_by_indexed_property<V: fmt::Display>(
        &self,
        property_name: &str,
        property_value: Option<V>,
    ) -> Result<Option<T>> {
        let index_key = self.index_key_for(property_name, property_value)?;
        match self.index_data.get_first_index_or_default(&index_key).await? {
            Some(record) => self.resolve(&record).await,
            None => Ok(None),
        }
    }

    /// Batch-resolves index records to entities, one point get per record.
    ///
    /// Records that decode to a missing entity (deleted since indexing, or
    /// left dangling by a partial failure) are dropped from the result, not
    /// surfaced as errors. Output preserves input order.
    pub async fn get_by_indexes(&self, records: &[IndexRecord]) -> Result<Vec<T>> {
        let mut entities = Vec::with_capacity(records.len());
        for record in records {
            if let Some(entity) = self.resolve(record).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Resolves one index record through a point get, noting dangling
    /// records.
    async fn resolve(&self, record: &IndexRecord) -> Result<Option<T>> {
        let Some(entity_key) = record.entity_key() else {
            self.note_dangling(record);
            return Ok(None);
        };

        let entity = self
            .get(&entity_key.partition_key, &entity_key.row_key)
            .await?;
        if entity.is_none() {
            self.note_dangling(record);
        }
        Ok(entity)
    }

    fn note_dangling(&self, record: &IndexRecord) {
        log::debug!(
            "dangling index record filtered: {} -> {}",
            record.partition_key,
            record.row_key
        );
        if let Some(hook) = &self.on_dangling_index {
            hook(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{IndexedField, TableEntity};
    use crate::test_utils::InMemoryTableStore;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Cat {
        partition_key: String,
        row_key: String,
        breed: String,
        chip_id: Option<String>,
        name: String,
    }

    impl TableEntity for Cat {
        fn partition_key(&self) -> &str {
            &self.partition_key
        }

        fn row_key(&self) -> &str {
            &self.row_key
        }

        fn entity_name() -> &'static str {
            "Cat"
        }
    }

    impl IndexedEntity for Cat {
        fn indexed_fields() -> &'static [IndexedField<Self>] {
            const FIELDS: &[IndexedField<Cat>] = &[
                IndexedField::new("Breed", |cat| Some(cat.breed.clone())),
                IndexedField::new("ChipId", |cat| cat.chip_id.clone()),
            ];
            FIELDS
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Rock {
        partition_key: String,
        row_key: String,
    }

    impl TableEntity for Rock {
        fn partition_key(&self) -> &str {
            &self.partition_key
        }

        fn row_key(&self) -> &str {
            &self.row_key
        }

        fn entity_name() -> &'static str {
            "Rock"
        }
    }

    impl IndexedEntity for Rock {
        fn indexed_fields() -> &'static [IndexedField<Self>] {
            &[]
        }
    }

    struct Fixture {
        repo: SimpleIndexRepository<Cat>,
        table: Arc<InMemoryTableStore<Cat>>,
        index_table: Arc<InMemoryTableStore<IndexRecord>>,
    }

    fn fixture() -> Fixture {
        let table = Arc::new(InMemoryTableStore::new());
        let index_table = Arc::new(InMemoryTableStore::new());
        let repo = SimpleIndexRepository::new(
            table.clone(),
            index_table.clone(),
            RepositoryOptions::default(),
        );
        Fixture {
            repo,
            table,
            index_table,
        }
    }

    fn cat(row_key: &str, breed: &str, chip_id: Option<&str>) -> Cat {
        Cat {
            partition_key: "cats".into(),
            row_key: row_key.into(),
            breed: breed.into(),
            chip_id: chip_id.map(String::from),
            name: format!("cat-{}", row_key),
        }
    }

    #[tokio::test]
    async fn add_writes_entity_and_one_record_per_indexed_field() {
        let f = fixture();
        f.repo.add(&cat("1", "Tabby", Some("c-9"))).await.unwrap();

        assert_eq!(f.table.len(), 1);
        assert_eq!(f.index_table.len(), 2);
    }

    #[tokio::test]
    async fn add_with_no_indexed_fields_touches_only_the_entity_table() {
        let table = Arc::new(InMemoryTableStore::new());
        let index_table: Arc<InMemoryTableStore<IndexRecord>> = Arc::new(InMemoryTableStore::new());
        let repo: SimpleIndexRepository<Rock> = SimpleIndexRepository::new(
            table.clone(),
            index_table.clone(),
            RepositoryOptions::default(),
        );

        let rock = Rock {
            partition_key: "r".into(),
            row_key: "1".into(),
        };
        repo.add(&rock).await.unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(index_table.len(), 0);
        assert_eq!(index_table.put_count(), 0);
        assert_eq!(index_table.query_count(), 0);
    }

    #[tokio::test]
    async fn update_of_missing_entity_fails() {
        let f = fixture();
        let err = f.repo.update(&cat("1", "Tabby", None)).await.unwrap_err();
        assert!(matches!(err, Error::EntityNotFound { .. }));
    }

    #[tokio::test]
    async fn update_with_no_changed_indexed_field_issues_no_index_writes() {
        let f = fixture();
        let mut subject = cat("1", "Tabby", Some("c-9"));
        f.repo.add(&subject).await.unwrap();

        let index_puts = f.index_table.put_count();
        let index_deletes = f.index_table.delete_count();

        // Only an unindexed field changes.
        subject.name = "renamed".into();
        f.repo.update(&subject).await.unwrap();

        assert_eq!(f.index_table.put_count(), index_puts);
        assert_eq!(f.index_table.delete_count(), index_deletes);
        assert_eq!(
            f.repo.get("cats", "1").await.unwrap().unwrap().name,
            "renamed"
        );
    }

    #[tokio::test]
    async fn update_replaces_only_the_changed_field() {
        let f = fixture();
        let mut subject = cat("1", "Tabby", Some("c-9"));
        f.repo.add(&subject).await.unwrap();

        let index_puts = f.index_table.put_count();
        let index_deletes = f.index_table.delete_count();

        subject.breed = "Calico".into();
        f.repo.update(&subject).await.unwrap();

        // Exactly one replace: one delete plus one put.
        assert_eq!(f.index_table.put_count(), index_puts + 1);
        assert_eq!(f.index_table.delete_count(), index_deletes + 1);

        let calico = f
            .repo
            .get_by_indexed_property("Breed", Some("Calico"))
            .await
            .unwrap();
        assert_eq!(calico.len(), 1);
        let tabby = f
            .repo
            .get_by_indexed_property("Breed", Some("Tabby"))
            .await
            .unwrap();
        assert!(tabby.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entity_and_all_index_records() {
        let f = fixture();
        let subject = cat("1", "Tabby", Some("c-9"));
        f.repo.add(&subject).await.unwrap();

        f.repo.delete(&subject).await.unwrap();

        assert_eq!(f.table.len(), 0);
        assert_eq!(f.index_table.len(), 0);
    }

    #[tokio::test]
    async fn lookup_by_unmatched_value_returns_empty_not_error() {
        let f = fixture();
        f.repo.add(&cat("1", "Tabby", None)).await.unwrap();

        let matches = f
            .repo
            .get_by_indexed_property("Breed", Some("Sphynx"))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn lookup_by_unindexed_property_fails() {
        let f = fixture();
        let err = f
            .repo
            .get_by_indexed_property("Name", Some("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotIndexed { .. }));

        let err = f
            .repo
            .get_by_indexed_property::<&str>("  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unset_indexed_value_is_indexed_as_empty_string() {
        let f = fixture();
        f.repo.add(&cat("1", "Tabby", None)).await.unwrap();

        let matches = f
            .repo
            .get_by_indexed_property::<&str>("ChipId", None)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn raw_lookup_value_is_sanitized_before_matching() {
        let f = fixture();
        f.repo.add(&cat("1", "Ta/bby", None)).await.unwrap();

        // The stored record carries the sanitized value; a raw query value
        // sanitizes to the same key.
        let matches = f
            .repo
            .get_by_indexed_property("Breed", Some("Ta/bby"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].breed, "Ta/bby");
    }

    #[tokio::test]
    async fn single_and_first_lookup_semantics() {
        let f = fixture();
        f.repo.add(&cat("1", "Tabby", None)).await.unwrap();
        f.repo.add(&cat("2", "Tabby", None)).await.unwrap();

        assert!(matches!(
            f.repo.get_single_by_indexed_property("Breed", Some("Tabby")).await,
            Err(Error::MultipleMatches)
        ));
        assert!(matches!(
            f.repo.get_single_by_indexed_property("Breed", Some("Sphynx")).await,
            Err(Error::NoMatches)
        ));
        assert!(f
            .repo
            .get_single_or_default_by_indexed_property("Breed", Some("Sphynx"))
            .await
            .unwrap()
            .is_none());

        assert!(f
            .repo
            .get_first_by_indexed_property("Breed", Some("Tabby"))
            .await
            .unwrap()
            .is_some());
        assert!(matches!(
            f.repo.get_first_by_indexed_property("Breed", Some("Sphynx")).await,
            Err(Error::NoMatches)
        ));
        assert!(f
            .repo
            .get_first_or_default_by_indexed_property("Breed", Some("Sphynx"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn dangling_index_records_are_filtered_and_observable() {
        let table = Arc::new(InMemoryTableStore::new());
        let index_table = Arc::new(InMemoryTableStore::new());
        let dangling_seen = Arc::new(AtomicUsize::new(0));
        let counter = dangling_seen.clone();
        let repo: SimpleIndexRepository<Cat> = SimpleIndexRepository::new(
            table.clone(),
            index_table.clone(),
            RepositoryOptions::default(),
        )
        .with_dangling_index_hook(move |_record| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        repo.add(&cat("1", "Tabby", None)).await.unwrap();
        repo.add(&cat("2", "Tabby", None)).await.unwrap();

        // Remove one entity behind the index's back.
        TableStore::<Cat>::delete(table.as_ref(), "cats", "1").await.unwrap();

        let matches = repo
            .get_by_indexed_property("Breed", Some("Tabby"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].row_key, "2");
        assert_eq!(dangling_seen.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn get_by_indexes_preserves_input_order() {
        let f = fixture();
        f.repo.add(&cat("1", "Tabby", None)).await.unwrap();
        f.repo.add(&cat("2", "Calico", None)).await.unwrap();

        let records = vec![
            IndexRecord {
                partition_key: "Breed|%|Calico".into(),
                row_key: "cats|%|2".into(),
            },
            IndexRecord {
                partition_key: "Breed|%|Tabby".into(),
                row_key: "cats|%|1".into(),
            },
        ];
        let entities = f.repo.get_by_indexes(&records).await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].row_key, "2");
        assert_eq!(entities[1].row_key, "1");
    }

    #[tokio::test]
    async fn paging_walks_an_indexed_lookup_exactly_once() {
        let f = fixture();
        for i in 0..5 {
            f.repo.add(&cat(&i.to_string(), "Tabby", None)).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = f
                .repo
                .page_by_indexed_property("Breed", Some("Tabby"), Some(2), token.as_deref())
                .await
                .unwrap();
            seen.extend(page.results);
            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn primary_table_reads() {
        let f = fixture();
        f.repo.add(&cat("1", "Tabby", None)).await.unwrap();
        f.repo.add(&cat("2", "Calico", None)).await.unwrap();

        assert_eq!(f.repo.get_all().await.unwrap().len(), 2);
        assert_eq!(f.repo.get_by_partition("cats").await.unwrap().len(), 2);
        assert_eq!(f.repo.get_by_partition("dogs").await.unwrap().len(), 0);
        assert!(f.repo.get("cats", "1").await.unwrap().is_some());
        assert!(f.repo.get("cats", "9").await.unwrap().is_none());

        let page = f.repo.page(Some(1), None).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(!page.is_final());
    }
}
