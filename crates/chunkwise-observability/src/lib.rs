//! # chunkwise-observability
//!
//! Logging and progress reporting for Chunkwise.
//!
//! ## Structured logging
//! Runs log through `tracing` with `run_id`, `mode`, `cursor` and `total`
//! fields. [`init_tracing`] installs a text or JSON subscriber with
//! per-component levels.
//!
//! ## Progress
//! [`log_progress`] builds an `on_progress` callback that reports slice
//! progress as `info!` records.

pub mod progress;
pub mod tracing_setup;

pub use progress::{log_progress, percent};
pub use tracing_setup::{build_directives, init_tracing, LogConfig, TracingInitError};
