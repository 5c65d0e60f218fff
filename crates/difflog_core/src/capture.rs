//! Change capture orchestration.
//!
//! A capture runs through a fixed sequence of states:
//! validating provenance, assembling the before/after snapshots for the
//! triggering operation, diffing, filtering, and persisting. Rejection
//! aborts the host write; an empty (or fully filtered) delta completes it
//! with no record.
//!
//! Host lifecycle hooks ("before create/update/remove") are modeled as an
//! explicit [`Change`] payload rather than callbacks, so the engine can be
//! driven from any store's hook mechanism.

use crate::config::{CapturePolicy, HistoryConfig};
use crate::error::HistoryResult;
use crate::filter;
use crate::history::{self, HistoryEntry};
use crate::provenance::{self, ChangeMeta};
use crate::reconstruct::Reconstructor;
use crate::sequencer::VersionSequencer;
use difflog_diff::value::{empty_document, get_path, set_path};
use difflog_diff::{Differ, Document, ElementIdentity};
use difflog_store::{Deadline, EntityKey, HistoryStore, VersionRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// The lifecycle event that triggered a capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The entity is being created. There is no prior state to diff
    /// against, so a creation never records a version.
    Created {
        /// The document being created.
        after: Document,
    },
    /// The whole document is being replaced.
    Replaced {
        /// The prior persisted document.
        before: Document,
        /// The new document.
        after: Document,
    },
    /// A partial update touching only the paths in `set`.
    FieldsUpdated {
        /// The prior persisted document.
        current: Document,
        /// The touched paths and their new values.
        set: FieldSet,
    },
    /// The entity is being deleted.
    Removed {
        /// The document being deleted.
        before: Document,
    },
}

/// A partial update: dotted field paths and their new values.
///
/// This is the shape of a host store's field-set update. Snapshots built
/// from it cover exactly the touched paths, so untouched fields never
/// produce spurious no-op deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    entries: Vec<(String, Document)>,
}

impl FieldSet {
    /// Creates an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path and its new value. Later entries win on the same path.
    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: Document) -> Self {
        self.entries.push((path.into(), value));
        self
    }

    /// Returns true if no paths are touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the before/after snapshots covering exactly the touched
    /// paths: `before` holds the prior value of each path that exists in
    /// `current`, `after` each path's new value.
    fn split_snapshots(&self, current: &Document) -> (Document, Document) {
        let mut before = empty_document();
        let mut after = empty_document();
        for (path, new_value) in &self.entries {
            let segments: Vec<&str> = path.split('.').collect();
            if let Some(old) = get_path(current, &segments) {
                set_path(&mut before, &segments, old.clone());
            }
            set_path(&mut after, &segments, new_value.clone());
        }
        (before, after)
    }
}

/// The result of a successful capture.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// A version record was persisted.
    Recorded(VersionRecord),
    /// Nothing needed recording; the host write proceeds normally.
    NoOp,
}

impl CaptureOutcome {
    /// Returns true if no record was persisted.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, CaptureOutcome::NoOp)
    }

    /// Returns the persisted record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&VersionRecord> {
        match self {
            CaptureOutcome::Recorded(record) => Some(record),
            CaptureOutcome::NoOp => None,
        }
    }
}

/// The engine facade: captures changes and serves the read paths.
///
/// Generic over the [`HistoryStore`] the host supplies. The engine runs
/// synchronously inside the host operation; the store handle is the only
/// shared resource and is borrowed per call.
pub struct HistoryEngine<S: HistoryStore> {
    store: Arc<S>,
    config: HistoryConfig,
    differ: Differ,
    sequencer: VersionSequencer,
    reconstructor: Reconstructor,
}

impl<S: HistoryStore> HistoryEngine<S> {
    /// Creates an engine over the given store and configuration.
    pub fn new(store: Arc<S>, config: HistoryConfig) -> Self {
        let differ = Differ::new();
        Self {
            sequencer: VersionSequencer::new(config.retry.clone()),
            reconstructor: Reconstructor::new(differ.clone()),
            store,
            config,
            differ,
        }
    }

    /// Replaces the array element identity strategy.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn ElementIdentity>) -> Self {
        self.differ = Differ::with_identity(identity);
        self.reconstructor = Reconstructor::new(self.differ.clone());
        self
    }

    /// Returns the engine's configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Captures one change, persisting a version record if it survives
    /// diffing and filtering.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HistoryError::MissingProvenance`] when mandatory
    /// metadata is absent (the host write must abort), and store errors
    /// per the configured [`CapturePolicy`].
    pub fn capture(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        change: Change,
        meta: &ChangeMeta,
        deadline: Deadline,
    ) -> HistoryResult<CaptureOutcome> {
        provenance::validate(self.config.required, meta)?;

        let (before, after) = match change {
            Change::Created { .. } => {
                debug!(collection, entity = %entity_id, "creation has no prior state, nothing to record");
                return Ok(CaptureOutcome::NoOp);
            }
            Change::Replaced { before, after } => (before, after),
            Change::FieldsUpdated { current, set } => set.split_snapshots(&current),
            Change::Removed { before } => (before, empty_document()),
        };

        let Some(delta) = self.differ.diff(&before, &after) else {
            return Ok(CaptureOutcome::NoOp);
        };
        let Some(delta) = filter::apply(delta, &self.config.omit, self.config.pick.as_deref())
        else {
            debug!(collection, entity = %entity_id, "delta filtered to empty, nothing to record");
            return Ok(CaptureOutcome::NoOp);
        };

        match self.sequencer.append(
            self.store.as_ref(),
            collection,
            entity_id,
            delta,
            meta,
            deadline,
        ) {
            Ok(record) => Ok(CaptureOutcome::Recorded(record)),
            Err(err) if self.config.policy == CapturePolicy::BestEffort => {
                warn!(
                    collection,
                    entity = %entity_id,
                    error = %err,
                    "history capture failed, host write proceeds without a record"
                );
                Ok(CaptureOutcome::NoOp)
            }
            Err(err) => Err(err),
        }
    }

    /// Captures a full-document change.
    ///
    /// This is the direct surface for hosts without a hook mechanism.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`HistoryEngine::capture`].
    pub fn capture_change(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        before: Document,
        after: Document,
        meta: &ChangeMeta,
        deadline: Deadline,
    ) -> HistoryResult<CaptureOutcome> {
        self.capture(
            collection,
            entity_id,
            Change::Replaced { before, after },
            meta,
            deadline,
        )
    }

    /// Returns the entity's raw version records, oldest first.
    ///
    /// # Errors
    ///
    /// Surfaces store errors from the read path.
    pub fn get_version_records(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> HistoryResult<Vec<VersionRecord>> {
        Ok(self.store.list_all(collection, entity_id, deadline)?)
    }

    /// Returns the entity's history rendered for display, oldest first.
    ///
    /// Fields listed in [`HistoryConfig::expandable`] have their old and
    /// new values spelled out in the summary.
    ///
    /// # Errors
    ///
    /// Surfaces store errors from the read path.
    pub fn get_history(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        deadline: Deadline,
    ) -> HistoryResult<Vec<HistoryEntry>> {
        let records = self.store.list_all(collection, entity_id, deadline)?;
        Ok(records
            .iter()
            .map(|record| history::entry_for(record, &self.config.expandable))
            .collect())
    }

    /// Returns the entity's document as of `version`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Reconstructor::at`].
    pub fn reconstruct_version(
        &self,
        collection: &str,
        entity_id: &EntityKey,
        version: u64,
        deadline: Deadline,
    ) -> HistoryResult<Document> {
        self.reconstructor
            .at(self.store.as_ref(), collection, entity_id, version, deadline)
    }
}

impl<S: HistoryStore> std::fmt::Debug for HistoryEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
