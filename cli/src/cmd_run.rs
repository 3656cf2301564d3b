//! `chunkwise map|filter|each|every`: drive one run and report on it.

use std::cell::{Cell, RefCell};
use std::io::Read;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use chunkwise_core::{ChunkError, ChunkRequest, Chunker, Completion, Mode, Policy, RunHandle};
use chunkwise_observability::log_progress;
use serde::Serialize;
use tracing::debug;

/// Per-invocation settings that are not part of the chunker config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Request cancellation once this many elements have been processed.
    pub cancel_after: Option<usize>,
    /// Log progress after each slice.
    pub log_progress: bool,
}

/// What a finished run reports back to the terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: Mode,
    pub total: usize,
    pub processed: usize,
    pub chunk_size: usize,
    pub cancelled: bool,
    /// Turns the heartbeat task got while the run was in progress.
    pub heartbeats: u64,
    pub output: serde_json::Value,
}

impl RunReport {
    pub fn print(&self, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }
        println!("Run:        {} ({})", self.run_id, self.mode);
        println!(
            "Processed:  {} / {} in slices of {}",
            self.processed, self.total, self.chunk_size
        );
        println!("Cancelled:  {}", if self.cancelled { "yes" } else { "no" });
        println!("Heartbeats: {}", self.heartbeats);
        if !self.output.is_null() {
            println!("Output:     {}", self.output);
        }
        Ok(())
    }
}

/// Read a JSON array of integers from a file, or stdin for `-`.
pub fn read_input(path: &str) -> Result<Vec<i64>> {
    let text = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("cannot read input '{path}'"))?
    };
    parse_input(&text).with_context(|| format!("input '{path}' is not a JSON array of integers"))
}

pub fn parse_input(text: &str) -> Result<Vec<i64>> {
    Ok(serde_json::from_str(text)?)
}

/// Start `request` under policy `P`, wait for it on the current `LocalSet`
/// and collect a report.
///
/// A heartbeat task counts its own turns for as long as the run is active,
/// which shows the run leaving room for other work between slices.
pub async fn execute<V, P>(
    chunker: &Chunker,
    request: ChunkRequest<i64, V, P::Output>,
    opts: &RunOptions,
) -> Result<RunReport>
where
    V: 'static,
    P: Policy<i64, V> + 'static,
    P::Output: Serialize + 'static,
{
    let mode = <P as Policy<i64, V>>::MODE;
    let completion: Rc<RefCell<Option<Completion<P::Output>>>> = Rc::new(RefCell::new(None));
    let failure: Rc<RefCell<Option<ChunkError>>> = Rc::new(RefCell::new(None));
    let handle_slot: Rc<RefCell<Option<RunHandle>>> = Rc::new(RefCell::new(None));

    let done = completion.clone();
    let failed = failure.clone();
    let slot = handle_slot.clone();
    let mut progress = opts.log_progress.then(|| log_progress(mode.to_string()));
    let cancel_after = opts.cancel_after;

    let request = request
        .on_complete(move |c| *done.borrow_mut() = Some(c))
        .on_error(move |e| *failed.borrow_mut() = Some(e))
        .on_progress(move |processed, total| {
            if let Some(log) = progress.as_mut() {
                log(processed, total);
            }
            if cancel_after.is_some_and(|limit| processed >= limit) {
                if let Some(handle) = slot.borrow().as_ref() {
                    handle.cancel();
                }
            }
        });

    // The first slice has already run; its progress call had no handle to cancel.
    let handle = chunker.run::<i64, V, P>(request)?;
    if cancel_after.is_some_and(|limit| handle.processed() >= limit) {
        handle.cancel();
    }
    *handle_slot.borrow_mut() = Some(handle.clone());

    let stop = Rc::new(Cell::new(false));
    let heartbeat = {
        let stop = stop.clone();
        tokio::task::spawn_local(async move {
            let mut beats = 0u64;
            while !stop.get() {
                beats += 1;
                tokio::task::yield_now().await;
            }
            beats
        })
    };

    handle.finished().await;
    stop.set(true);
    let heartbeats = heartbeat.await.context("heartbeat task failed")?;
    debug!(run_id = %handle.id(), phase = %handle.phase(), heartbeats, "Run settled");

    if let Some(err) = failure.borrow_mut().take() {
        return Err(anyhow::Error::new(err).context(format!("run {} failed", handle.id())));
    }
    let completion = completion
        .borrow_mut()
        .take()
        .ok_or_else(|| anyhow!("run {} ended without completing", handle.id()))?;

    Ok(RunReport {
        run_id: handle.id().to_string(),
        mode,
        total: handle.total(),
        processed: handle.processed(),
        chunk_size: chunker.config().effective_chunk_size(None),
        cancelled: completion.cancelled,
        heartbeats,
        output: serde_json::to_value(&completion.output)?,
    })
}
