//! Cancellation and deadline context threaded through every store call.

use crate::storage::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag plus an optional absolute deadline.
///
/// Cloning is cheap; clones observe the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never expires and is never cancelled unless asked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Request cancellation. Safe to call from a signal handler thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail if the caller cancelled or the deadline passed.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StoreError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Errors instead of sleeping past the deadline.
    pub fn sleep(&self, duration: Duration) -> Result<(), StoreError> {
        const SLICE: Duration = Duration::from_millis(25);

        if let Some(remaining) = self.remaining() {
            if duration > remaining {
                return Err(StoreError::DeadlineExceeded);
            }
        }

        let until = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            std::thread::sleep(SLICE.min(until - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes() {
        assert!(CallContext::new().check().is_ok());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = CallContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(matches!(ctx.check(), Err(StoreError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = CallContext::new().with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(StoreError::DeadlineExceeded)));
    }

    #[test]
    fn test_sleep_refuses_to_outlive_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
        let result = ctx.sleep(Duration::from_secs(5));
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }

    #[test]
    fn test_sleep_returns_early_when_cancelled() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert!(matches!(
            ctx.sleep(Duration::from_secs(5)),
            Err(StoreError::Cancelled)
        ));
    }
}
