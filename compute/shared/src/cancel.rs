//! Cooperative cancellation
//!
//! Cancellation is a shared flag that every blocking operation polls, so
//! teardown flows through normal control flow and ownership rather than
//! through an asynchronous signal handler. Workers drain at their next
//! suspension point and resources are released exactly once, by Drop.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// How long blocked operations wait between cancellation checks
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag requesting that an in-flight run tear down
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);
//
impl CancelToken {
    /// Create a token with no cancellation requested yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    ///
    /// Idempotent and callable from any thread, including a Ctrl-C handler.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Marker returned by blocking operations that observed cancellation
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Interrupted;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_sticky_and_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
