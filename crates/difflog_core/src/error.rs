//! Error types for the history engine.

use crate::provenance::ProvenanceField;
use difflog_diff::DiffError;
use difflog_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while capturing or reconstructing history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Required change metadata was not supplied.
    ///
    /// Raised before any diff or store work; the host write must abort.
    #[error("{field} is required when making a change but was not provided")]
    MissingProvenance {
        /// The missing field.
        field: ProvenanceField,
    },

    /// The store failed or the version conflict retry budget ran out.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted delta cannot be applied during reconstruction.
    ///
    /// Fatal for the reconstruction call; never retried or guessed around.
    #[error("stored delta for version {version} cannot be applied: {source}")]
    MalformedDelta {
        /// Version of the record whose delta failed to apply.
        version: u64,
        /// The underlying application failure.
        #[source]
        source: DiffError,
    },
}

impl HistoryError {
    /// Returns true if the caller may retry the whole operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, HistoryError::Store(err) if err.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_store_classification() {
        assert!(HistoryError::Store(StoreError::Timeout).is_retryable());
        assert!(!HistoryError::Store(StoreError::serialization("bad")).is_retryable());
        assert!(!HistoryError::MissingProvenance {
            field: ProvenanceField::Actor
        }
        .is_retryable());
        assert!(!HistoryError::MalformedDelta {
            version: 2,
            source: DiffError::shape_mismatch("object delta on scalar"),
        }
        .is_retryable());
    }

    #[test]
    fn display_names_the_missing_field() {
        let err = HistoryError::MissingProvenance {
            field: ProvenanceField::Reason,
        };
        assert_eq!(
            err.to_string(),
            "reason is required when making a change but was not provided"
        );
    }
}
