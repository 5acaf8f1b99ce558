//! Single-threaded implementation of the heat diffusion simulation
//!
//! This backend runs every round on the calling thread, flipping the double
//! buffer between rounds. It is the correctness oracle for the parallel
//! backend: for the same configuration both must produce bit-identical
//! snapshots.

use compute::{
    cancel::CancelToken, kernel, ConfigError, Outcome, RunConfig, Simulate, SnapshotSink,
};
use data::{
    parameters::Parameters,
    surface::{Surface, Temperature},
};
use ndarray::s;

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
    type Error = ConfigError;

    fn run<S: SnapshotSink>(
        &self,
        initial: Temperature,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<Outcome, ConfigError> {
        let side = initial.nrows();
        self.config.validate(side)?;
        let interval = self.config.checkpoint_interval();

        let mut surface = Surface::new(initial);
        for step in 0..self.config.total_steps {
            if cancel.is_cancelled() {
                return Ok(Outcome::Interrupted);
            }

            let (input, output) = surface.inout();
            kernel::diffuse_rows(
                &self.params,
                input.view(),
                output.slice_mut(s![1..side - 1, ..]),
                1..side - 1,
            );
            surface.flip();

            let completed = step + 1;
            if completed % interval == 0 {
                if let Err(err) = sink.export(surface.input().view(), completed) {
                    log::warn!("snapshot at step {completed} was not persisted: {err}");
                }
            }
        }
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::Precision;
    use ndarray::{Array2, ArrayView2};
    use std::{convert::Infallible, num::NonZeroUsize};

    /// Sink keeping every export in memory
    #[derive(Default)]
    struct MemorySink(Vec<(usize, Temperature)>);
    //
    impl SnapshotSink for MemorySink {
        type Error = Infallible;

        fn export(
            &mut self,
            snapshot: ArrayView2<'_, Precision>,
            completed_steps: usize,
        ) -> Result<(), Infallible> {
            self.0.push((completed_steps, snapshot.to_owned()));
            Ok(())
        }
    }

    fn config(total_steps: usize, checkpoints: usize) -> RunConfig {
        RunConfig {
            num_workers: NonZeroUsize::new(1).unwrap(),
            total_steps,
            checkpoints: NonZeroUsize::new(checkpoints).unwrap(),
        }
    }

    #[test]
    fn checkpoints_are_labelled_by_cumulative_steps() {
        let simulation = Simulation::new(Parameters::default(), config(100, 4));
        let mut sink = MemorySink::default();

        let outcome = simulation
            .run(Array2::zeros((8, 8)), &mut sink, &CancelToken::new())
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        let labels: Vec<usize> = sink.0.iter().map(|(steps, _)| *steps).collect();
        assert_eq!(labels, [25, 50, 75, 100]);
    }

    #[test]
    fn linear_fields_never_change() {
        let initial = Array2::from_shape_fn((6, 6), |(i, j)| (3 * i + j) as Precision);
        let simulation = Simulation::new(Parameters::default(), config(8, 4));
        let mut sink = MemorySink::default();

        simulation
            .run(initial.clone(), &mut sink, &CancelToken::new())
            .unwrap();

        for (_, snapshot) in &sink.0 {
            assert_eq!(snapshot, &initial);
        }
    }

    #[test]
    fn cancellation_short_circuits_the_run() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let simulation = Simulation::new(Parameters::default(), config(100, 4));
        let mut sink = MemorySink::default();

        let outcome = simulation
            .run(Array2::zeros((8, 8)), &mut sink, &cancel)
            .unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        assert!(sink.0.is_empty());
    }
}
