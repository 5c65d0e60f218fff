//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this version already exists for the entity.
    ///
    /// Raised by [`crate::HistoryStore::append`] when another writer won
    /// the race for the version number. Retryable: the caller recomputes
    /// the next version and tries again.
    #[error("version conflict: {collection}/{entity_id} already has version {version}")]
    VersionConflict {
        /// The collection of the contested entity.
        collection: String,
        /// The contested entity.
        entity_id: String,
        /// The version that already exists.
        version: u64,
    },

    /// The caller-supplied deadline expired before the operation completed.
    #[error("store operation timed out")]
    Timeout,

    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a retryable unavailability error.
    pub fn unavailable_retryable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable unavailability error.
    pub fn unavailable_fatal(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true if the operation may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::VersionConflict { .. } | StoreError::Timeout => true,
            StoreError::Unavailable { retryable, .. } => *retryable,
            StoreError::Serialization { .. } => false,
        }
    }
}
