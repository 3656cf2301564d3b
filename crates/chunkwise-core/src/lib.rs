//! # chunkwise-core
//!
//! Cooperative chunked iteration for single-threaded async hosts.
//!
//! A run splits a sequence into fixed-size slices, processes one slice
//! synchronously, then yields back to the host so timers, I/O callbacks and
//! other tasks get a turn before the next slice.
//!
//! ## Architecture
//! ```text
//! ChunkRequest (source, operation, chunk_size, callbacks)
//!       │
//!       ▼
//! Chunker::{map, filter, for_each, every}   ← synchronous validation
//!       │
//!       ▼
//! ChunkRun<T, V, Policy>  ── step() ── Yielder ── step() ── …
//!       │
//!       ▼
//! on_complete(Completion) | on_error(ChunkError)
//! ```
//!
//! Runs are independent: each one is controlled through its own
//! [`RunHandle`].

pub mod chunker;
pub mod config;
pub mod error;
pub mod handle;
pub mod policy;
pub mod request;
pub mod scheduler;
pub mod state;
pub mod yielder;

pub use chunker::Chunker;
pub use config::{ChunkerConfig, DEFAULT_CHUNK_SIZE};
pub use error::{BoxError, ChunkError, ConfigError};
pub use handle::RunHandle;
pub use policy::{AllSatisfy, Fold, Mode, Policy, Select, Transform, Visit};
pub use request::{ChunkRequest, Completion};
pub use scheduler::{ChunkRun, Step};
pub use state::{RunPhase, RunState, RunStatus};
pub use yielder::{HostYield, NoYield, Yielder};
