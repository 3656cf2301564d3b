//! Chunkwise CLI: run the four iteration modes over JSON input in
//! cooperative slices.
//!
//! # Commands
//! ```text
//! chunkwise map    --op square|double|negate|abs    [--input <path|->]
//! chunkwise filter --op even|odd|positive|negative  [--input <path|->]
//! chunkwise each   --op print                       [--input <path|->]
//! chunkwise every  --op even|odd|positive|negative  [--input <path|->]
//! chunkwise info
//! ```

use std::path::PathBuf;

use anyhow::Result;
use chunkwise_core::{AllSatisfy, ChunkRequest, Chunker, Select, Transform, Visit};
use chunkwise_observability::init_tracing;
use clap::{Args, Parser, Subcommand};
use tokio::task::LocalSet;

mod cmd_info;
mod cmd_run;
mod config;
mod ops;

use cmd_run::{execute, read_input, RunOptions};
use config::CliConfig;
use ops::{EachOp, MapOp, PredicateOp};

#[derive(Parser)]
#[command(
    name = "chunkwise",
    about = "Cooperative chunked iteration: map, filter, each and every in slices",
    long_about = "
Chunkwise processes a JSON array of integers a slice at a time, yielding to
other tasks between slices. A heartbeat task runs next to every command and
reports how many turns it got while the run was in progress.

ENVIRONMENT VARIABLES:
  CHUNKWISE_CHUNK_SIZE   Default elements per slice (overridden by --chunk-size)
  CHUNKWISE_LOG          Log level or filter directives, e.g. 'info,chunkwise_core=debug'
",
    version
)]
struct Cli {
    /// Enable verbose output (debug logs and per-slice progress)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML config file with `chunker:` and `log:` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace every element with the result of an operation
    Map {
        #[arg(long, value_enum)]
        op: MapOp,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Keep the elements that satisfy a predicate
    Filter {
        #[arg(long, value_enum)]
        op: PredicateOp,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Visit every element for its side effect
    Each {
        #[arg(long, value_enum, default_value = "print")]
        op: EachOp,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check whether every element satisfies a predicate
    Every {
        #[arg(long, value_enum)]
        op: PredicateOp,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Show Chunkwise build info and effective settings
    Info,
}

#[derive(Args)]
struct RunArgs {
    /// JSON array of integers; `-` reads stdin
    #[arg(short, long, default_value = "-")]
    input: String,
    /// Elements per slice
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Cancel the run once this many elements have been processed
    #[arg(long)]
    cancel_after: Option<usize>,
    /// Output the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    let chunk_flag = match &cli.command {
        Commands::Map { run, .. }
        | Commands::Filter { run, .. }
        | Commands::Each { run, .. }
        | Commands::Every { run, .. } => run.chunk_size,
        Commands::Info => None,
    };
    config.apply_flags(chunk_flag, cli.verbose)?;
    init_tracing(&config.log)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = LocalSet::new();
    local.block_on(&rt, dispatch(cli.command, cli.verbose, config))
}

async fn dispatch(command: Commands, verbose: bool, config: CliConfig) -> Result<()> {
    let chunker = Chunker::new(config.chunker.clone());

    let (report, as_json) = match command {
        Commands::Map { op, run } => {
            let req = ChunkRequest::new()
                .source(read_input(&run.input)?)
                .try_operation(move |x: &i64| op.apply(*x));
            let report = execute::<i64, Transform>(&chunker, req, &options(&run, verbose)).await?;
            (report, run.json)
        }
        Commands::Filter { op, run } => {
            let req = ChunkRequest::new()
                .source(read_input(&run.input)?)
                .operation(move |x: &i64| op.test(*x));
            let report = execute::<bool, Select>(&chunker, req, &options(&run, verbose)).await?;
            (report, run.json)
        }
        Commands::Each { op, run } => {
            let req = ChunkRequest::new()
                .source(read_input(&run.input)?)
                .operation(move |x: &i64| op.visit(*x));
            let report = execute::<(), Visit>(&chunker, req, &options(&run, verbose)).await?;
            (report, run.json)
        }
        Commands::Every { op, run } => {
            let req = ChunkRequest::new()
                .source(read_input(&run.input)?)
                .operation(move |x: &i64| op.test(*x));
            let report =
                execute::<bool, AllSatisfy>(&chunker, req, &options(&run, verbose)).await?;
            (report, run.json)
        }
        Commands::Info => return cmd_info::run(&config),
    };

    report.print(as_json)
}

fn options(run: &RunArgs, verbose: bool) -> RunOptions {
    RunOptions {
        cancel_after: run.cancel_after,
        log_progress: verbose,
    }
}
