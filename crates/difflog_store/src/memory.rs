//! In-memory history store for testing.

use crate::deadline::Deadline;
use crate::error::{StoreError, StoreResult};
use crate::record::{EntityKey, NewVersionRecord, VersionRecord};
use crate::store::HistoryStore;
use difflog_diff::Document;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::SystemTime;

type EntityRef = (String, EntityKey);

#[derive(Default)]
struct Inner {
    /// Version records per entity, kept sorted ascending by version.
    records: HashMap<EntityRef, Vec<VersionRecord>>,
    /// Live documents, standing in for the host store's own collections.
    current: HashMap<EntityRef, Document>,
}

/// An in-memory [`HistoryStore`].
///
/// Suitable for unit tests, integration tests, and ephemeral embedding.
/// The exclusive write lock makes the check-and-insert in [`HistoryStore::append`]
/// atomic, satisfying the version-uniqueness invariant.
///
/// # Thread Safety
///
/// The store is thread-safe and can be shared across threads.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the live document of an entity.
    ///
    /// Stands in for the host store's own write path in tests.
    pub fn put_current(&self, collection: &str, entity_id: &EntityKey, document: Document) {
        self.inner
            .write()
            .current
            .insert((collection.to_string(), entity_id.clone()), document);
    }

    /// Removes the live document of an entity.
    pub fn remove_current(&self, collection: &str, entity_id: &EntityKey) {
        self.inner
            .write()
            .current
            .remove(&(collection.to_string(), entity_id.clone()));
    }

    /// Returns the number of records held for an entity.
    #[must_use]
    pub fn record_count(&self, collection: &str, entity_id: &EntityKey) -> usize {
        self.inner
            .read()
            .records
            .get(&(collection.to_string(), entity_id.clone()))
            .map_or(0, Vec::len)
    }
}

impl HistoryStore for InMemoryStore {
    fn find_current(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> StoreResult<Option<Document>> {
        deadline.check()?;
        Ok(self
            .inner
            .read()
            .current
            .get(&(collection.to_string(), entity_id.clone()))
            .cloned())
    }

    fn append(&self, record: NewVersionRecord, deadline: Deadline) -> StoreResult<VersionRecord> {
        deadline.check()?;
        let mut inner = self.inner.write();
        let key = (record.entity_collection.clone(), record.entity_id.clone());
        let records = inner.records.entry(key).or_default();

        if records.iter().any(|r| r.version == record.version) {
            return Err(StoreError::VersionConflict {
                collection: record.entity_collection,
                entity_id: record.entity_id.to_string(),
                version: record.version,
            });
        }

        let stamped = record.into_record(SystemTime::now());
        records.push(stamped.clone());
        records.sort_unstable_by_key(|r| r.version);
        Ok(stamped)
    }

    fn last_version(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> StoreResult<Option<u64>> {
        deadline.check()?;
        Ok(self
            .inner
            .read()
            .records
            .get(&(collection.to_string(), entity_id.clone()))
            .and_then(|records| records.last().map(|r| r.version)))
    }

    fn list_since(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        min_version: u64,
        deadline: Deadline,
    ) -> StoreResult<Vec<VersionRecord>> {
        deadline.check()?;
        let mut matching: Vec<VersionRecord> = self
            .inner
            .read()
            .records
            .get(&(collection.to_string(), entity_id.clone()))
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.version >= min_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_unstable_by(|a, b| b.version.cmp(&a.version));
        Ok(matching)
    }

    fn list_all(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> StoreResult<Vec<VersionRecord>> {
        deadline.check()?;
        Ok(self
            .inner
            .read()
            .records
            .get(&(collection.to_string(), entity_id.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("InMemoryStore")
            .field("entities", &inner.records.len())
            .finish_non_exhaustive()
    }
}
