//! Caller-supplied deadlines for store round-trips.

use crate::error::{StoreError, StoreResult};
use std::time::{Duration, Instant};

/// An optional point in time after which store operations must give up.
///
/// A capture or reconstruction carries one deadline across all of its
/// store round-trips; expiry surfaces as [`StoreError::Timeout`], which is
/// classified retryable for the caller. An expired deadline aborts the
/// in-flight operation before any partial write.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// A deadline expiring `timeout` from now.
    #[must_use]
    pub fn within(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// A deadline expiring at `instant`.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Returns true if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|cutoff| Instant::now() >= cutoff)
    }

    /// Fails with [`StoreError::Timeout`] if the deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Timeout` when expired.
    pub fn check(&self) -> StoreResult<()> {
        if self.is_expired() {
            Err(StoreError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn past_deadline_is_expired() {
        let deadline = Deadline::at(Instant::now() - Duration::from_millis(1));
        assert!(deadline.is_expired());
        assert!(matches!(deadline.check(), Err(StoreError::Timeout)));
    }

    #[test]
    fn future_deadline_is_not_expired() {
        let deadline = Deadline::within(Duration::from_secs(60));
        assert!(!deadline.is_expired());
    }
}
