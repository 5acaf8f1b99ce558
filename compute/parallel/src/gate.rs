//! Round completion gate
//!
//! Detects which worker is the last to finish a round, and lets exactly
//! that worker act on the round transition.

use std::sync::Mutex;

/// What a worker learns when reporting the end of its round
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoundReport {
    /// Peers are still computing; idle until the next barrier release
    NotLast,

    /// This worker finished the round and owns the transition
    Last,
}

/// Shared counter detecting the last completion of each round
#[derive(Debug)]
pub struct CompletionGate {
    /// Reports that end one round
    num_workers: usize,

    /// Reports received in the current round
    finished: Mutex<usize>,
}
//
impl CompletionGate {
    /// Set up the gate for rounds of `num_workers` reports
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            finished: Mutex::new(0),
        }
    }

    /// Report this worker's share of the round as finished
    ///
    /// Exactly one caller per round observes [`RoundReport::Last`]. The
    /// counter resets itself as part of that observation, so no separate
    /// re-arm step exists that could race with the next round's reports.
    pub fn report_done(&self) -> RoundReport {
        let mut finished = self.finished.lock().expect("gate lock poisoned");
        *finished += 1;
        if *finished == self.num_workers {
            *finished = 0;
            RoundReport::Last
        } else {
            RoundReport::NotLast
        }
    }
}
