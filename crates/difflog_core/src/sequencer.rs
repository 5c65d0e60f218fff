//! Version assignment.
//!
//! Reading the last version and inserting the next record is the one
//! correctness-critical sequence in the engine: two writers racing on it
//! can assign the same version and silently corrupt every later
//! reconstruction. The sequencer closes the race twice over: a per-entity
//! critical section serializes writers inside this process, and the
//! store's version-unique `append` turns any remaining race (other
//! processes, other machines) into a retryable
//! [`StoreError::VersionConflict`] that is resolved by recomputing the
//! version and trying again.

use crate::config::RetryConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::provenance::ChangeMeta;
use difflog_diff::Delta;
use difflog_store::{Deadline, EntityKey, HistoryStore, NewVersionRecord, StoreError, VersionRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

type EntityRef = (String, EntityKey);

/// Assigns gap-free version numbers and appends records.
///
/// Captures on different entities never contend; captures on the same
/// entity are serialized.
pub struct VersionSequencer {
    retry: RetryConfig,
    locks: Mutex<HashMap<EntityRef, Arc<Mutex<()>>>>,
}

impl VersionSequencer {
    /// Creates a sequencer with the given retry behavior.
    #[must_use]
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            retry,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn entity_lock(&self, collection: &str, entity_id: &EntityKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry((collection.to_string(), entity_id.clone()))
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Appends `delta` as the entity's next version.
    ///
    /// The version is `last recorded + 1`, or `0` for a fresh entity. A
    /// [`StoreError::VersionConflict`] or transient store failure is
    /// retried with backoff and a recomputed version, up to the configured
    /// attempt budget; a timeout aborts immediately.
    ///
    /// # Errors
    ///
    /// Surfaces the store error once the retry budget is exhausted, and
    /// [`StoreError::Timeout`] when the deadline expires.
    pub fn append<S: HistoryStore>(
        &self,
        store: &S,
        collection: &str,
        entity_id: &EntityKey,
        delta: Delta,
        meta: &ChangeMeta,
        deadline: Deadline,
    ) -> HistoryResult<VersionRecord> {
        let lock = self.entity_lock(collection, entity_id);
        let _guard = lock.lock();

        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                std::thread::sleep(self.retry.delay_for_attempt(attempt));
            }
            deadline.check()?;

            let version = store
                .last_version(collection, entity_id, deadline)?
                .map_or(0, |last| last + 1);
            let record = NewVersionRecord::new(collection, entity_id.clone(), delta.clone(), version)
                .with_actor(meta.actor.clone())
                .with_reason(meta.reason.clone());

            match store.append(record, deadline) {
                Ok(persisted) => {
                    debug!(collection, entity = %entity_id, version, "version recorded");
                    return Ok(persisted);
                }
                Err(StoreError::Timeout) => return Err(StoreError::Timeout.into()),
                Err(err) if err.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    warn!(
                        collection,
                        entity = %entity_id,
                        attempt,
                        error = %err,
                        "append failed, retrying with recomputed version"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_error
            .map(HistoryError::from)
            .unwrap_or_else(|| StoreError::unavailable_fatal("no append attempts made").into()))
    }
}

impl std::fmt::Debug for VersionSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionSequencer")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
