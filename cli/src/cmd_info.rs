//! `chunkwise info`

use anyhow::Result;
use chunkwise_core::DEFAULT_CHUNK_SIZE;
use chunkwise_observability::build_directives;

use crate::config::{CliConfig, ENV_CHUNK_SIZE, ENV_LOG};

pub fn run(config: &CliConfig) -> Result<()> {
    println!("Chunkwise v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Modes:");
    println!("  map      collect operation(element) for every element");
    println!("  filter   keep elements whose predicate holds");
    println!("  each     visit every element for its side effect");
    println!("  every    true iff every element passes (stops at the first failure)");
    println!();
    println!("Effective settings:");
    println!(
        "  chunk size:   {} (built-in default {})",
        config.chunker.chunk_size, DEFAULT_CHUNK_SIZE
    );
    println!("  log filter:   {}", build_directives(&config.log));
    println!("  log format:   {}", if config.log.json { "json" } else { "text" });
    println!();
    println!("Environment:");
    println!("  {ENV_CHUNK_SIZE}, {ENV_LOG}");
    Ok(())
}
