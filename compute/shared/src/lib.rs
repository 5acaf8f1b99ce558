//! Common facilities shared by all simulation backends

pub mod cancel;
pub mod kernel;

use crate::cancel::CancelToken;
use data::{surface::Temperature, Precision};
use ndarray::ArrayView2;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Outcome of a simulation run that tore down cleanly
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// All configured rounds ran and every checkpoint was processed
    Completed,

    /// Cancellation was requested and the run drained early
    Interrupted,
}

/// Simulation backend interface expected by the "simulate" CLI program
pub trait Simulate {
    /// Things that can go wrong while running this backend
    type Error: std::error::Error;

    /// Run the simulation to completion (or interruption), feeding every
    /// checkpoint snapshot to `sink`
    fn run<S: SnapshotSink>(
        &self,
        initial: Temperature,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<Outcome, Self::Error>;
}

/// Persistence collaborator receiving settled snapshots
///
/// An export runs to completion before the next round is allowed to start,
/// since the exported buffer may be overwritten afterwards. Export failures
/// do not abort the run: the backend logs them and carries on, skipping that
/// checkpoint's durability.
pub trait SnapshotSink {
    /// Why a snapshot could not be persisted
    type Error: std::fmt::Display;

    /// Persist one settled snapshot, labelled by cumulative completed steps
    fn export(
        &mut self,
        snapshot: ArrayView2<'_, Precision>,
        completed_steps: usize,
    ) -> Result<(), Self::Error>;
}

/// Run dimensions shared by all backends
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct RunConfig {
    /// Number of workers updating the grid
    pub num_workers: NonZeroUsize,

    /// Total number of simulation rounds
    pub total_steps: usize,

    /// Number of checkpoints at which a snapshot is exported
    pub checkpoints: NonZeroUsize,
}
//
impl RunConfig {
    /// Steps between two checkpoints
    pub fn checkpoint_interval(&self) -> usize {
        self.total_steps / self.checkpoints.get()
    }

    /// Validate the preconditions the round protocol relies on
    ///
    /// Must pass before any worker starts: the partitioner hands out row
    /// ranges assuming these divisibility properties and does not check them
    /// again at claim time.
    pub fn validate(&self, side: usize) -> Result<(), ConfigError> {
        if side < 3 {
            return Err(ConfigError::GridTooSmall { side });
        }
        if side % self.num_workers.get() != 0 {
            return Err(ConfigError::UnevenRows {
                side,
                num_workers: self.num_workers.get(),
            });
        }
        if self.total_steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        if self.total_steps % self.checkpoints.get() != 0 {
            return Err(ConfigError::UnevenCheckpoints {
                total_steps: self.total_steps,
                checkpoints: self.checkpoints.get(),
            });
        }
        Ok(())
    }
}

/// Configuration that violates a round-protocol precondition
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Grid has no interior cells to simulate
    #[error("grid of side {side} has no interior to simulate")]
    GridTooSmall { side: usize },

    /// The row partition would leave gaps or overlaps
    #[error("{num_workers} workers cannot evenly partition a grid of side {side}")]
    UnevenRows { side: usize, num_workers: usize },

    /// Nothing to simulate
    #[error("total step count must be nonzero")]
    NoSteps,

    /// The checkpoint cadence would silently truncate
    #[error("{checkpoints} checkpoints do not evenly divide {total_steps} steps")]
    UnevenCheckpoints {
        total_steps: usize,
        checkpoints: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(num_workers: usize, total_steps: usize, checkpoints: usize) -> RunConfig {
        RunConfig {
            num_workers: NonZeroUsize::new(num_workers).unwrap(),
            total_steps,
            checkpoints: NonZeroUsize::new(checkpoints).unwrap(),
        }
    }

    #[test]
    fn reference_configuration_is_valid() {
        let cfg = config(4, 100, 4);
        assert_eq!(cfg.validate(2000), Ok(()));
        assert_eq!(cfg.checkpoint_interval(), 25);
    }

    #[test]
    fn preconditions_are_rejected_before_any_round() {
        assert_eq!(
            config(4, 100, 4).validate(2),
            Err(ConfigError::GridTooSmall { side: 2 })
        );
        assert_eq!(
            config(5, 100, 4).validate(12),
            Err(ConfigError::UnevenRows {
                side: 12,
                num_workers: 5
            })
        );
        assert_eq!(config(4, 0, 4).validate(12), Err(ConfigError::NoSteps));
        assert_eq!(
            config(4, 100, 3).validate(12),
            Err(ConfigError::UnevenCheckpoints {
                total_steps: 100,
                checkpoints: 3
            })
        );
    }
}
