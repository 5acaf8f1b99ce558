//! Round partitioner
//!
//! Hands out disjoint, contiguous row ranges covering exactly the interior
//! rows of the grid, one claim per worker per round. The claim ordinal, not
//! worker identity, drives the boundary adjustment, so coverage holds
//! regardless of claim order.

use std::{ops::Range, sync::Mutex};

/// Per-round claim bookkeeping
#[derive(Debug, Default)]
struct Cursor {
    /// First row of the next range to hand out
    next_row: usize,

    /// Number of claims made this round
    arrived: usize,
}

/// Dynamic row-range distributor
#[derive(Debug)]
pub struct RoundPartitioner {
    /// Rows per claim, before boundary adjustment
    chunk: usize,

    /// Claims per round
    num_workers: usize,

    /// Claim state, rewound at every round transition
    cursor: Mutex<Cursor>,
}
//
impl RoundPartitioner {
    /// Set up the partitioner for a grid of `side` rows shared by
    /// `num_workers` claimants
    ///
    /// `num_workers` must evenly divide `side`; run-configuration validation
    /// rejects anything else before workers start, and claims do not
    /// re-check.
    pub fn new(side: usize, num_workers: usize) -> Self {
        debug_assert!(num_workers > 0 && side % num_workers == 0);
        Self {
            chunk: side / num_workers,
            num_workers,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    /// Claim the next row range of the current round
    ///
    /// The first claim of a round skips the top boundary row and the last
    /// claim excludes the bottom one, so the ranges of one round exactly
    /// cover the interior rows `1..side - 1`.
    pub fn claim(&self) -> Range<usize> {
        let mut cursor = self.cursor.lock().expect("partitioner lock poisoned");
        cursor.arrived += 1;
        let mut start = cursor.next_row;
        cursor.next_row += self.chunk;
        let mut end = cursor.next_row;
        if cursor.arrived == 1 {
            start += 1;
        }
        if cursor.arrived == self.num_workers {
            end -= 1;
        }
        start..end
    }

    /// Rewind for the next round
    ///
    /// Only the single round-transition owner may call this, after the
    /// completion gate confirmed that every claimant of the previous round
    /// reported back.
    pub fn reset(&self) {
        let mut cursor = self.cursor.lock().expect("partitioner lock poisoned");
        *cursor = Cursor::default();
    }
}
