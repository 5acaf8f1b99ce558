use clap::Parser;
use compute::{cancel::CancelToken, Outcome, RunConfig, Simulate, SnapshotSink};
use compute_parallel::Simulation;
use data::{csv, parameters::Parameters, Precision};
use eyre::{Result, WrapErr};
use indicatif::ProgressBar;
use ndarray::ArrayView2;
use std::{num::NonZeroUsize, path::PathBuf, thread};

/// Simulate heat diffusion over a surface
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the initial temperature grid (row-major CSV)
    input: PathBuf,

    /// Number of worker threads (must evenly divide the grid side)
    #[arg(short = 'j', long)]
    num_workers: Option<NonZeroUsize>,

    /// Number of simulation rounds
    #[arg(short, long, default_value_t = 100)]
    steps: usize,

    /// Number of snapshots exported over the course of the run
    #[arg(long, default_value_t = NonZeroUsize::new(4).unwrap())]
    checkpoints: NonZeroUsize,

    /// Path snapshot names are derived from (defaults to the input path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Diffusion rate along the column (horizontal) axis
    #[arg(long)]
    cx: Option<Precision>,

    /// Diffusion rate along the row (vertical) axis
    #[arg(long)]
    cy: Option<Precision>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let grid = csv::read_matrix(&args.input).wrap_err("failed to load the temperature grid")?;
    let side = grid.nrows();

    let num_workers = match args.num_workers {
        Some(num_workers) => num_workers,
        None => thread::available_parallelism()
            .wrap_err("failed to probe the available parallelism")?,
    };
    let config = RunConfig {
        num_workers,
        total_steps: args.steps,
        checkpoints: args.checkpoints,
    };
    config.validate(side)?;

    let default_params = Parameters::default();
    let params = Parameters {
        diffusion_rate_x: args.cx.unwrap_or(default_params.diffusion_rate_x),
        diffusion_rate_y: args.cy.unwrap_or(default_params.diffusion_rate_y),
    };

    // Ctrl-C requests a cooperative teardown rather than killing the run
    let cancel = CancelToken::new();
    ctrlc::set_handler({
        let cancel = cancel.clone();
        move || cancel.cancel()
    })
    .wrap_err("failed to install the interrupt handler")?;

    let progress = ProgressBar::new(args.steps as u64);
    let mut sink = CsvSink {
        writer: csv::Writer::new(args.output.as_ref().unwrap_or(&args.input)),
        progress: progress.clone(),
        steps_per_checkpoint: config.checkpoint_interval() as u64,
    };

    log::info!(
        "simulating a {side}x{side} grid for {} steps across {num_workers} workers",
        args.steps
    );
    match Simulation::new(params, config).run(grid, &mut sink, &cancel)? {
        Outcome::Completed => {
            progress.finish();
            log::info!("simulation complete");
        }
        Outcome::Interrupted => {
            progress.abandon();
            log::warn!("simulation interrupted, snapshots written so far were kept");
        }
    }
    Ok(())
}

/// Snapshot sink writing CSV files and advancing the progress bar
struct CsvSink {
    writer: csv::Writer,
    progress: ProgressBar,
    steps_per_checkpoint: u64,
}
//
impl SnapshotSink for CsvSink {
    type Error = csv::Error;

    fn export(
        &mut self,
        snapshot: ArrayView2<'_, Precision>,
        completed_steps: usize,
    ) -> Result<(), csv::Error> {
        let path = self.writer.write(snapshot, completed_steps)?;
        log::info!("wrote {}", path.display());
        self.progress.inc(self.steps_per_checkpoint);
        Ok(())
    }
}
