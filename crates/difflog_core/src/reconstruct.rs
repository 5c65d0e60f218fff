//! Historical snapshot reconstruction.

use crate::error::{HistoryError, HistoryResult};
use difflog_diff::{value::empty_document, Differ, Document};
use difflog_store::{Deadline, EntityKey, HistoryStore};
use tracing::debug;

/// Rebuilds past document states by replaying deltas in reverse.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    differ: Differ,
}

impl Reconstructor {
    /// Creates a reconstructor sharing the engine's differ.
    #[must_use]
    pub fn new(differ: Differ) -> Self {
        Self { differ }
    }

    /// Returns the entity's document as of `target_version`.
    ///
    /// Starts from the live document (or `{}` if the entity no longer
    /// exists) and reverses every delta newer than the target, newest
    /// first. A target at or beyond the latest recorded version returns
    /// the current snapshot unchanged.
    ///
    /// Reconstruction against a concurrently-mutating entity is a
    /// point-in-time best effort: the walk only ever moves strictly
    /// backward from the snapshot it read, but is not linearizable with
    /// in-flight captures.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::MalformedDelta`] when a stored delta does
    /// not fit the document it is applied to, and store errors from the
    /// read path.
    pub fn at<S: HistoryStore>(
        &self,
        store: &S,
        collection: &str,
        entity_id: &EntityKey,
        target_version: u64,
        deadline: Deadline,
    ) -> HistoryResult<Document> {
        let mut document = store
            .find_current(collection, entity_id, deadline)?
            .unwrap_or_else(empty_document);

        // Only deltas newer than the target are reversed; the delta at the
        // target version itself produced the state we want.
        let records = store.list_since(
            collection,
            entity_id,
            target_version.saturating_add(1),
            deadline,
        )?;
        debug!(
            collection,
            entity = %entity_id,
            target_version,
            replayed = records.len(),
            "reconstructing snapshot"
        );

        for record in &records {
            document = self
                .differ
                .unpatch(&document, &record.delta)
                .map_err(|source| HistoryError::MalformedDelta {
                    version: record.version,
                    source,
                })?;
        }
        Ok(document)
    }
}
