//! Version records and entity identity.

use difflog_diff::Delta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Opaque identifier of a logical entity, unique within its collection.
///
/// The engine never interprets the key; it only groups and orders version
/// records by it. Host stores supply whatever identifier they use natively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Creates a key from an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityKey {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A version record that has not been persisted yet.
///
/// Timestamps are assigned by the store at insert time; everything else is
/// fixed by the capture that produced the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVersionRecord {
    /// Logical record type the entity belongs to.
    pub entity_collection: String,
    /// The entity the change applies to.
    pub entity_id: EntityKey,
    /// The structural delta; never empty.
    pub delta: Delta,
    /// Sequence position within the entity's history, starting at 0.
    pub version: u64,
    /// Who made the change, if known.
    pub actor: Option<String>,
    /// Why the change was made, if given.
    pub reason: Option<String>,
}

impl NewVersionRecord {
    /// Creates a record for the given entity and version.
    pub fn new(
        entity_collection: impl Into<String>,
        entity_id: EntityKey,
        delta: Delta,
        version: u64,
    ) -> Self {
        Self {
            entity_collection: entity_collection.into(),
            entity_id,
            delta,
            version,
            actor: None,
            reason: None,
        }
    }

    /// Sets the acting user.
    #[must_use]
    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    /// Sets the change reason.
    #[must_use]
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Stamps the record with store-assigned timestamps.
    ///
    /// Called by store implementations at insert time.
    #[must_use]
    pub fn into_record(self, now: SystemTime) -> VersionRecord {
        VersionRecord {
            entity_collection: self.entity_collection,
            entity_id: self.entity_id,
            delta: self.delta,
            version: self.version,
            actor: self.actor,
            reason: self.reason,
            recorded_at: now,
            updated_at: now,
        }
    }
}

/// One persisted entry of an entity's change history.
///
/// Records are created once and never updated or deleted; retention
/// policies, if any, live outside this crate.
///
/// # Invariant
///
/// For a fixed `(entity_collection, entity_id)` the persisted `version`
/// values form the gap-free sequence `0, 1, 2, …` in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Logical record type the entity belongs to.
    pub entity_collection: String,
    /// The entity the change applies to.
    pub entity_id: EntityKey,
    /// The structural delta; never empty.
    pub delta: Delta,
    /// Sequence position within the entity's history, starting at 0.
    pub version: u64,
    /// Who made the change, if known.
    pub actor: Option<String>,
    /// Why the change was made, if given.
    pub reason: Option<String>,
    /// When the store persisted the record.
    pub recorded_at: SystemTime,
    /// Last store write; equals `recorded_at` for immutable records.
    pub updated_at: SystemTime,
}
