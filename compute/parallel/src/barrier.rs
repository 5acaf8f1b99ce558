//! Resettable phase barrier
//!
//! A counting permit pool of fixed capacity: each worker consumes one permit
//! to proceed into a round, and the pool must be explicitly re-armed with a
//! full round of permits once drained. Unlike [`std::sync::Barrier`], the
//! release point is driven externally, which is what lets the round
//! transition hand off between the last worker and the coordinator.

use compute::cancel::{CancelToken, Interrupted, POLL_INTERVAL};
use std::sync::{Condvar, Mutex};

/// Gate releasing all workers of a round together
#[derive(Debug)]
pub struct PhaseBarrier {
    /// Unconsumed permits of the current round
    permits: Mutex<usize>,

    /// Signalled when a new round of permits is injected
    armed: Condvar,
}
//
impl PhaseBarrier {
    /// Create a barrier holding an initial round of `permits` permits
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            armed: Condvar::new(),
        }
    }

    /// Inject a full round of permits
    ///
    /// Only the single round-transition owner may call this, and only once
    /// every permit of the previous round was consumed; anything else is a
    /// protocol bug.
    pub fn arm(&self, permits: usize) {
        let mut available = self.permits.lock().expect("barrier lock poisoned");
        assert_eq!(*available, 0, "armed while permits were outstanding");
        *available = permits;
        self.armed.notify_all();
    }

    /// Consume one permit, blocking until one is available
    ///
    /// Returns `Err(Interrupted)` instead once `cancel` fires, whether or
    /// not a permit is available, so draining workers never start a round.
    pub fn enter(&self, cancel: &CancelToken) -> Result<(), Interrupted> {
        let mut available = self.permits.lock().expect("barrier lock poisoned");
        loop {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }
            if *available > 0 {
                *available -= 1;
                return Ok(());
            }
            (available, _) = self
                .armed
                .wait_timeout(available, POLL_INTERVAL)
                .expect("barrier lock poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::mpsc::{self, RecvTimeoutError},
        thread,
        time::Duration,
    };

    #[test]
    fn permits_are_consumed_one_by_one() {
        let barrier = PhaseBarrier::new(2);
        let cancel = CancelToken::new();
        assert_eq!(barrier.enter(&cancel), Ok(()));
        assert_eq!(barrier.enter(&cancel), Ok(()));

        barrier.arm(1);
        assert_eq!(barrier.enter(&cancel), Ok(()));
    }

    #[test]
    fn enter_blocks_until_armed() {
        let barrier = PhaseBarrier::new(0);
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            let (barrier, cancel) = (&barrier, &cancel);
            s.spawn(move || {
                barrier.enter(cancel).unwrap();
                tx.send(()).unwrap();
            });

            // The waiter must not get through before the barrier is armed
            assert_eq!(
                rx.recv_timeout(Duration::from_millis(150)),
                Err(RecvTimeoutError::Timeout)
            );

            barrier.arm(1);
            rx.recv_timeout(Duration::from_secs(5))
                .expect("armed barrier should release the waiter");
        });
    }

    #[test]
    fn cancellation_releases_waiters_without_a_permit() {
        let barrier = PhaseBarrier::new(0);
        let cancel = CancelToken::new();

        thread::scope(|s| {
            let (barrier, cancel) = (&barrier, &cancel);
            let waiter = s.spawn(move || barrier.enter(cancel));
            cancel.cancel();
            assert_eq!(waiter.join().unwrap(), Err(Interrupted));
        });
    }

    #[test]
    fn cancellation_wins_over_available_permits() {
        let barrier = PhaseBarrier::new(1);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(barrier.enter(&cancel), Err(Interrupted));
    }

    #[test]
    #[should_panic(expected = "armed while permits were outstanding")]
    fn double_arming_is_a_protocol_bug() {
        let barrier = PhaseBarrier::new(1);
        barrier.arm(1);
    }
}
