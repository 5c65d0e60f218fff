//! # difflog core
//!
//! The diff-based versioning engine.
//!
//! Every accepted change to a document produces a structural delta against
//! the prior state, persisted as a [`VersionRecord`] with a gap-free
//! per-entity version sequence. Any past state is reconstructed by
//! replaying deltas in reverse against the current snapshot.
//!
//! The engine composes:
//! - provenance validation ([`provenance`])
//! - structural diffing (`difflog_diff`)
//! - field filtering ([`filter`])
//! - race-free version sequencing ([`sequencer`])
//! - reconstruction ([`reconstruct`]) and the history feed ([`history`])
//!
//! behind the [`HistoryEngine`] facade. Persistence is delegated to a
//! [`HistoryStore`] supplied by the host; the engine runs synchronously
//! inside the host's create/update/delete operation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use difflog_core::{Change, ChangeMeta, Deadline, HistoryConfig, HistoryEngine, InMemoryStore};
//!
//! let engine = HistoryEngine::new(Arc::new(InMemoryStore::new()), HistoryConfig::default());
//! let outcome = engine.capture_change(
//!     "users", &"u1".into(), before, after,
//!     &ChangeMeta::by("alice"), Deadline::none(),
//! )?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod provenance;
pub mod reconstruct;
pub mod sequencer;

pub use capture::{CaptureOutcome, Change, FieldSet, HistoryEngine};
pub use config::{CapturePolicy, HistoryConfig, RetryConfig};
pub use error::{HistoryError, HistoryResult};
pub use history::HistoryEntry;
pub use provenance::{ChangeMeta, ProvenanceField, RequiredProvenance};
pub use reconstruct::Reconstructor;
pub use sequencer::VersionSequencer;

pub use difflog_diff::{Delta, Differ, Document, ElementIdentity, IdFieldIdentity, IdentityKey};
pub use difflog_store::{
    Deadline, EntityKey, HistoryStore, InMemoryStore, NewVersionRecord, StoreError, VersionRecord,
};
