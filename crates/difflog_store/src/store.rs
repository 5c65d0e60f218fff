//! History store trait definition.

use crate::deadline::Deadline;
use crate::error::StoreResult;
use crate::record::{EntityKey, NewVersionRecord, VersionRecord};
use difflog_diff::Document;

/// The persistence capability the engine consumes from a host document
/// store.
///
/// Implementations wrap whatever store holds the live documents and the
/// version records; the engine never talks to storage any other way.
///
/// # Invariants
///
/// - `append` must be atomic per `(collection, entity_id, version)`: when
///   two writers race with the same version, exactly one insert succeeds
///   and the other observes [`crate::StoreError::VersionConflict`]. A
///   unique index over the triple, an optimistic-concurrency token, or a
///   store-native conditional insert all satisfy this.
/// - `append` must never leave a partially written record, including on
///   deadline expiry.
/// - `list_since` returns records with `version >= min_version` in
///   **descending** version order; `list_all` returns the full history in
///   **ascending** order.
/// - Every operation honors the caller's [`Deadline`].
/// - Implementations must be `Send + Sync`; captures on different entities
///   run concurrently.
///
/// # Implementors
///
/// - [`crate::InMemoryStore`] for tests and ephemeral embedding
pub trait HistoryStore: Send + Sync {
    /// Returns the live document of an entity, if it still exists.
    ///
    /// # Errors
    ///
    /// Returns a store error on connectivity failure or deadline expiry.
    fn find_current(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> StoreResult<Option<Document>>;

    /// Inserts a version record, enforcing version uniqueness.
    ///
    /// Returns the stamped record as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::VersionConflict`] when the entity
    /// already has a record with `record.version`, or another store error
    /// on failure.
    fn append(&self, record: NewVersionRecord, deadline: Deadline) -> StoreResult<VersionRecord>;

    /// Returns the highest recorded version for an entity, if any.
    ///
    /// # Errors
    ///
    /// Returns a store error on connectivity failure or deadline expiry.
    fn last_version(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> StoreResult<Option<u64>>;

    /// Returns records with `version >= min_version`, newest first.
    ///
    /// This is the reconstruction read path.
    ///
    /// # Errors
    ///
    /// Returns a store error on connectivity failure or deadline expiry.
    fn list_since(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        min_version: u64,
        deadline: Deadline,
    ) -> StoreResult<Vec<VersionRecord>>;

    /// Returns the entity's full history, oldest first.
    ///
    /// This is the change-feed read path.
    ///
    /// # Errors
    ///
    /// Returns a store error on connectivity failure or deadline expiry.
    fn list_all(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> StoreResult<Vec<VersionRecord>>;
}
