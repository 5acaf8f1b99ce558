//! Parallel implementation of the heat diffusion simulation
//!
//! P worker threads share one double-buffered grid. Each round, a
//! resettable phase barrier releases all workers together; every worker
//! claims a disjoint row range from the round partitioner, applies the
//! stencil kernel to it, and reports to the completion gate. The single
//! worker that observes the last report owns the round transition: it
//! either re-arms the barrier itself or, at checkpoint boundaries, hands
//! control to the coordinator, which exports a settled snapshot before
//! re-arming.

pub mod barrier;
pub mod gate;
pub mod grid;
pub mod partition;

use crate::{
    barrier::PhaseBarrier,
    gate::{CompletionGate, RoundReport},
    grid::SharedSurface,
    partition::RoundPartitioner,
};
use compute::{
    cancel::{CancelToken, Interrupted, POLL_INTERVAL},
    kernel, ConfigError, Outcome, RunConfig, Simulate, SnapshotSink,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use data::{parameters::Parameters, surface::Temperature};
use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};
use thiserror::Error;

/// Heat diffusion simulation
#[derive(Debug)]
pub struct Simulation {
    /// Simulation parameters
    params: Parameters,

    /// Run dimensions
    config: RunConfig,
}
//
impl Simulation {
    /// Set up the simulation
    pub fn new(params: Parameters, config: RunConfig) -> Self {
        Self { params, config }
    }
}
//
impl Simulate for Simulation {
    type Error = Error;

    fn run<S: SnapshotSink>(
        &self,
        initial: Temperature,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<Outcome, Error> {
        let side = initial.nrows();
        self.config.validate(side)?;
        let num_workers = self.config.num_workers.get();

        let surface = SharedSurface::new(initial);
        let sync = RoundSync {
            step: AtomicUsize::new(0),
            barrier: PhaseBarrier::new(num_workers),
            partitioner: RoundPartitioner::new(side, num_workers),
            gate: CompletionGate::new(num_workers),
        };
        let (checkpoint_tx, checkpoint_rx) = bounded(1);

        thread::scope(|scope| {
            for index in 0..num_workers {
                let worker = Worker {
                    params: &self.params,
                    config: &self.config,
                    surface: &surface,
                    sync: &sync,
                    cancel,
                    checkpoint_tx: checkpoint_tx.clone(),
                };
                thread::Builder::new()
                    .name(format!("worker-{index}"))
                    .spawn_scoped(scope, move || worker.run())
                    .map_err(|source| {
                        // Already-spawned workers drain through the barrier
                        cancel.cancel();
                        Error::Spawn(source)
                    })?;
            }
            // Workers hold the only remaining senders, so the coordinator
            // unblocks by disconnection if they all drain early.
            drop(checkpoint_tx);

            Ok(coordinate(
                &self.config,
                &surface,
                &sync,
                &checkpoint_rx,
                sink,
                cancel,
            ))
        })
    }
}

/// Things that can go wrong when running the parallel simulation
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration violates a round-protocol precondition
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread could not be spawned
    #[error("failed to spawn a worker thread")]
    Spawn(#[source] io::Error),
}

/// Round state shared by all workers and the coordinator
#[derive(Debug)]
struct RoundSync {
    /// Completed rounds so far
    ///
    /// Written only by the round-transition owner; the barrier release
    /// publishes the new value before any worker enters the next round.
    step: AtomicUsize,

    /// Gate releasing all workers of a round together
    barrier: PhaseBarrier,

    /// Row-range distributor
    partitioner: RoundPartitioner,

    /// Last-completion detector
    gate: CompletionGate,
}

/// Round-transition handoff from the last worker to the coordinator
#[derive(Copy, Clone, Debug)]
struct CheckpointReached {
    /// Rounds completed when the checkpoint was crossed
    completed_steps: usize,
}

/// One worker thread's view of the run
struct Worker<'run> {
    params: &'run Parameters,
    config: &'run RunConfig,
    surface: &'run SharedSurface,
    sync: &'run RoundSync,
    cancel: &'run CancelToken,
    checkpoint_tx: Sender<CheckpointReached>,
}
//
impl Worker<'_> {
    /// Round loop of one worker thread
    fn run(self) {
        loop {
            if self.sync.barrier.enter(self.cancel).is_err() {
                log::debug!("worker draining after cancellation");
                return;
            }

            // Re-checking after the barrier keeps a stale pre-barrier read
            // from admitting an extra round past the final re-arm.
            let step = self.sync.step.load(Ordering::Acquire);
            if step >= self.config.total_steps {
                return;
            }

            let rows = self.sync.partitioner.claim();
            // SAFETY: `rows` comes from the partitioner, so no two write
            // windows of this round overlap, and the barrier protocol keeps
            // the read buffer immutable for the duration of round `step`.
            let (input, output) = unsafe {
                (
                    self.surface.read_view(step),
                    self.surface.write_rows(step, rows.clone()),
                )
            };
            kernel::diffuse_rows(self.params, input, output, rows);

            if self.sync.gate.report_done() == RoundReport::Last {
                self.finish_round(step + 1);
            }
        }
    }

    /// Drive the round transition, as the single last finisher of the round
    fn finish_round(&self, completed_steps: usize) {
        self.sync.step.store(completed_steps, Ordering::Release);
        if completed_steps % self.config.checkpoint_interval() == 0 {
            log::debug!("checkpoint crossed after {completed_steps} steps");
            // The coordinator re-arms once the snapshot is exported. The
            // send only fails if the coordinator drained early, in which
            // case every worker is draining too.
            let _ = self.checkpoint_tx.send(CheckpointReached { completed_steps });
        } else {
            self.sync.partitioner.reset();
            self.sync.barrier.arm(self.config.num_workers.get());
        }
    }
}

/// Checkpoint side of the round handoff, run on the driver thread
fn coordinate<S: SnapshotSink>(
    config: &RunConfig,
    surface: &SharedSurface,
    sync: &RoundSync,
    checkpoint_rx: &Receiver<CheckpointReached>,
    sink: &mut S,
    cancel: &CancelToken,
) -> Outcome {
    for _ in 0..config.checkpoints.get() {
        let checkpoint = match wait_for_checkpoint(checkpoint_rx, cancel) {
            Ok(checkpoint) => checkpoint,
            Err(Interrupted) => return Outcome::Interrupted,
        };
        let completed_steps = checkpoint.completed_steps;

        // SAFETY: every worker reported this round done, and none can enter
        // the next round until the barrier is re-armed below, so the settled
        // buffer cannot change under the export.
        let snapshot = unsafe { surface.settled(completed_steps) };
        if let Err(err) = sink.export(snapshot, completed_steps) {
            // Explicit policy: a failed export skips that checkpoint's
            // durability instead of aborting the run.
            log::warn!("snapshot at step {completed_steps} was not persisted: {err}");
        }

        sync.partitioner.reset();
        sync.barrier.arm(config.num_workers.get());
    }
    Outcome::Completed
}

/// Block until a worker crosses a checkpoint, observing cancellation and
/// worker-side disconnection
fn wait_for_checkpoint(
    checkpoint_rx: &Receiver<CheckpointReached>,
    cancel: &CancelToken,
) -> Result<CheckpointReached, Interrupted> {
    loop {
        match checkpoint_rx.recv_timeout(POLL_INTERVAL) {
            Ok(checkpoint) => return Ok(checkpoint),
            Err(RecvTimeoutError::Timeout) if !cancel.is_cancelled() => continue,
            Err(_) => return Err(Interrupted),
        }
    }
}
