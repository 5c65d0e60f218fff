//! Error types for delta application.

use thiserror::Error;

/// Result type for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors that can occur when applying a delta to a document.
///
/// Computing a diff never fails; these errors arise when a stored delta
/// does not fit the document it is applied to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiffError {
    /// The delta references a document shape that does not exist.
    #[error("delta does not match document shape: {message}")]
    ShapeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// An array operation points outside the array.
    #[error("array index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the array at application time.
        len: usize,
    },

    /// Two array operations claim the same position.
    #[error("duplicate array position {index} in delta")]
    DuplicatePosition {
        /// The duplicated index.
        index: usize,
    },
}

impl DiffError {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }
}
