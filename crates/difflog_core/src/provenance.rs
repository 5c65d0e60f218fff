//! Change provenance and its validation.

use crate::error::{HistoryError, HistoryResult};
use std::fmt;

/// Metadata attached to a change: who made it and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeMeta {
    /// Opaque identifier of the acting user.
    pub actor: Option<String>,
    /// Free-text justification for the change.
    pub reason: Option<String>,
}

impl ChangeMeta {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata with just an actor.
    pub fn by(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            reason: None,
        }
    }

    /// Sets the actor.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A provenance field that configuration can make mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvenanceField {
    /// The acting user.
    Actor,
    /// The change justification.
    Reason,
}

impl fmt::Display for ProvenanceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenanceField::Actor => f.write_str("actor"),
            ProvenanceField::Reason => f.write_str("reason"),
        }
    }
}

/// Which provenance fields are mandatory for a change to be accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiredProvenance {
    /// Reject changes without an actor.
    pub actor: bool,
    /// Reject changes without a reason.
    pub reason: bool,
}

impl RequiredProvenance {
    /// Nothing is mandatory.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            actor: false,
            reason: false,
        }
    }

    /// The actor is mandatory.
    #[must_use]
    pub const fn actor() -> Self {
        Self {
            actor: true,
            reason: false,
        }
    }

    /// Both actor and reason are mandatory.
    #[must_use]
    pub const fn both() -> Self {
        Self {
            actor: true,
            reason: true,
        }
    }
}

/// Checks that every mandatory provenance field is present and non-empty.
///
/// Runs before any diff or store work; a failure means the host write must
/// not proceed. An empty string counts as missing.
///
/// # Errors
///
/// Returns [`HistoryError::MissingProvenance`] naming the first missing
/// field.
pub fn validate(required: RequiredProvenance, meta: &ChangeMeta) -> HistoryResult<()> {
    if required.actor && meta.actor.as_deref().unwrap_or("").is_empty() {
        return Err(HistoryError::MissingProvenance {
            field: ProvenanceField::Actor,
        });
    }
    if required.reason && meta.reason.as_deref().unwrap_or("").is_empty() {
        return Err(HistoryError::MissingProvenance {
            field: ProvenanceField::Reason,
        });
    }
    Ok(())
}
