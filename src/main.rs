use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod baseline;
mod config;
mod dataset;
mod error;
mod index;
mod metrics;
mod models;
mod output;
mod records;
mod runner;
mod stats;

use crate::config::Config;
use crate::runner::Runner;

/// CRS Arena evaluation - correlate predicted dialogue-quality scores with gold annotations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the combined run JSON file
    run_file: PathBuf,

    /// Path to the gold evaluation JSON file (default: ../crs_arena_eval.json next to the run directory)
    eval_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::from_env()?;
    let eval_file = config.resolve_eval_file(args.eval_file.as_deref(), &args.run_file);
    let runner = Runner::new(config);

    let report = runner.run(&args.run_file, &eval_file)?;

    output::print_report(&report, runner.output_format())?;

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
