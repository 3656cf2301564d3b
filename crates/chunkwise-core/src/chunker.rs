//! `Chunker`: entry points for the four iteration modes.

use std::sync::{Mutex, PoisonError};

use crate::config::ChunkerConfig;
use crate::error::ConfigError;
use crate::handle::RunHandle;
use crate::policy::{AllSatisfy, Policy, Select, Transform, Visit};
use crate::request::ChunkRequest;
use crate::scheduler::ChunkRun;
use crate::state::RunPhase;

/// Starts chunked runs on the current `LocalSet`.
///
/// Every entry point validates its request and processes the first slice
/// synchronously, then returns the new run's [`RunHandle`]. Later slices run
/// on subsequent host turns. The `Chunker` also remembers the most recently
/// started run so [`Chunker::cancel`] can stop "the current run" without a
/// handle.
///
/// # Usage
/// ```no_run
/// # async fn example() -> Result<(), chunkwise_core::ConfigError> {
/// use chunkwise_core::{ChunkRequest, Chunker, ChunkerConfig, Completion, ConfigError};
///
/// let local = tokio::task::LocalSet::new();
/// local
///     .run_until(async {
///         let chunker = Chunker::new(ChunkerConfig::default());
///         let handle = chunker.map(
///             ChunkRequest::new()
///                 .source((0..10_000u64).collect::<Vec<_>>())
///                 .operation(|x: &u64| x * x)
///                 .on_complete(|done: Completion<Vec<u64>>| {
///                     println!("{} squares", done.output.len())
///                 }),
///         )?;
///         handle.finished().await;
///         Ok::<(), ConfigError>(())
///     })
///     .await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Chunker {
    config: ChunkerConfig,
    current: Mutex<Option<RunHandle>>,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self {
            config,
            current: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Start a run for any policy.
    ///
    /// # Panics
    /// Panics if the run outlives its first slice and this is called outside
    /// of a `tokio::task::LocalSet`.
    pub fn run<T, V, P>(&self, request: ChunkRequest<T, V, P::Output>) -> Result<RunHandle, ConfigError>
    where
        T: 'static,
        V: 'static,
        P: Policy<T, V> + 'static,
        P::Output: 'static,
    {
        let run = ChunkRun::<T, V, P>::new(request, &self.config)?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(run.handle());
        Ok(run.spawn_local())
    }

    /// Transform: completes with `operation(element)` for every element.
    pub fn map<T, V>(&self, request: ChunkRequest<T, V, Vec<V>>) -> Result<RunHandle, ConfigError>
    where
        T: 'static,
        V: 'static,
    {
        self.run::<T, V, Transform>(request)
    }

    /// Select: completes with the elements whose predicate returned `true`.
    pub fn filter<T>(&self, request: ChunkRequest<T, bool, Vec<T>>) -> Result<RunHandle, ConfigError>
    where
        T: Clone + 'static,
    {
        self.run::<T, bool, Select>(request)
    }

    /// Visit: calls the operation on every element for its effect.
    pub fn for_each<T>(&self, request: ChunkRequest<T, (), ()>) -> Result<RunHandle, ConfigError>
    where
        T: 'static,
    {
        self.run::<T, (), Visit>(request)
    }

    /// AllSatisfy: completes with `true` iff every element passes.
    pub fn every<T>(&self, request: ChunkRequest<T, bool, bool>) -> Result<RunHandle, ConfigError>
    where
        T: 'static,
    {
        self.run::<T, bool, AllSatisfy>(request)
    }

    /// Handle of the most recently started run, if it is still running.
    pub fn current(&self) -> Option<RunHandle> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|h| h.is_running())
            .cloned()
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some()
    }

    /// Phase of the current run, or `Idle` when nothing is running.
    pub fn phase(&self) -> RunPhase {
        self.current().map_or(RunPhase::Idle, |h| h.phase())
    }

    /// Cancel the most recently started run. No-op when no run is active.
    pub fn cancel(&self) -> bool {
        match self.current() {
            Some(handle) => handle.cancel(),
            None => false,
        }
    }
}
