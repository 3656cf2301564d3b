//! `ChunkRun`: the chunked iteration state machine.
//!
//! A run processes `chunk_size` elements synchronously, then hands control
//! back to the host before the next slice. The loop state lives in a plain
//! [`RunState`] record, so a run can be stepped by hand, driven without
//! yielding, or driven on a `LocalSet` with real host turns in between.
//!
//! ```text
//! step()  ─ slice [cursor, cursor+chunk_size) ─ fold ─ on_progress
//!    │
//!    ├─ cancel requested ──────────→ on_complete(partial, cancelled) → Cancelled
//!    ├─ more elements ─────────────→ Yield ─ (host turn) ─ step()
//!    ├─ exhausted / short-circuit ─→ on_complete(output)              → Completed
//!    └─ error or panic ────────────→ on_error(err) or Err(err)        → Errored
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info, warn, Instrument};

use crate::config::ChunkerConfig;
use crate::error::{ChunkError, ConfigError};
use crate::handle::RunHandle;
use crate::policy::{Fold, Policy};
use crate::request::{ChunkRequest, CompleteFn, Completion, ErrorFn, OperationFn, ProgressFn};
use crate::state::{RunPhase, RunState, RunStatus};
use crate::yielder::{HostYield, Yielder};

/// Result of a single slice step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More slices remain; yield to the host before stepping again.
    Yield,
    /// The run has ended.
    Done(RunStatus),
}

/// One run of a mode policy `P` over a source of `T`.
pub struct ChunkRun<T, V, P: Policy<T, V>> {
    source: Arc<[T]>,
    operation: OperationFn<T, V>,
    chunk_size: usize,
    on_complete: Option<CompleteFn<P::Output>>,
    on_progress: Option<ProgressFn>,
    on_error: Option<ErrorFn>,
    state: RunState<P::Output>,
    handle: RunHandle,
    status: Option<RunStatus>,
    _policy: PhantomData<fn() -> P>,
}

impl<T, V, P: Policy<T, V>> ChunkRun<T, V, P> {
    /// Validate `request` and prepare a run. No element is touched yet.
    pub fn new(
        request: ChunkRequest<T, V, P::Output>,
        config: &ChunkerConfig,
    ) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        if request.source.is_none() {
            missing.push("source");
        }
        if request.operation.is_none() {
            missing.push("operation");
        }
        let (Some(source), Some(operation)) = (request.source, request.operation) else {
            warn!(mode = %P::MODE, ?missing, "Rejected chunked run request");
            return Err(ConfigError::MissingParams {
                mode: P::MODE,
                params: missing,
            });
        };

        let handle = RunHandle::new(P::MODE, source.len());
        let chunk_size = config.effective_chunk_size(request.chunk_size);
        debug!(
            run_id = %handle.id(),
            mode = %P::MODE,
            total = source.len(),
            chunk_size,
            "Run accepted"
        );
        handle.set_phase(RunPhase::Yielded);

        Ok(Self {
            source,
            operation,
            chunk_size,
            on_complete: request.on_complete,
            on_progress: request.on_progress,
            on_error: request.on_error,
            state: RunState::new(P::empty()),
            handle,
            status: None,
            _policy: PhantomData,
        })
    }

    /// Handle for cancelling and observing this run.
    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Index of the next unprocessed element.
    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    /// Output accumulated so far.
    pub fn accumulator(&self) -> &P::Output {
        &self.state.accumulator
    }

    /// Process one slice.
    ///
    /// Returns `Err` only for an element error with no `on_error` route.
    /// Stepping an ended run is a no-op returning its final status.
    pub fn step(&mut self) -> Result<Step, ChunkError> {
        if let Some(status) = self.status {
            return Ok(Step::Done(status));
        }

        let total = self.source.len();
        let range = self.state.next_slice(self.chunk_size, total);
        if range.is_empty() {
            return Ok(Step::Done(self.complete(false)));
        }

        self.handle.set_phase(RunPhase::Slicing);
        debug!(
            run_id = %self.handle.id(),
            cursor = range.start,
            end = range.end,
            total,
            "Processing slice"
        );

        let mut end = range.end;
        let mut short_circuit = false;
        for index in range {
            let value = match self.apply(index) {
                Ok(value) => value,
                Err(err) => return self.fail(err),
            };
            if P::fold(&mut self.state.accumulator, &self.source[index], value) == Fold::Finish {
                end = index + 1;
                short_circuit = true;
                break;
            }
        }

        self.state.advance_to(end);
        self.handle.set_processed(end);
        let reported = match self.on_progress.as_mut() {
            Some(progress) => panic::catch_unwind(AssertUnwindSafe(|| progress(end, total))),
            None => Ok(()),
        };
        if let Err(payload) = reported {
            return self.fail(ChunkError::ProgressPanicked {
                processed: end,
                message: panic_message(payload.as_ref()),
            });
        }

        if short_circuit {
            debug!(run_id = %self.handle.id(), at = end - 1, "Short-circuited");
            return Ok(Step::Done(self.complete(false)));
        }
        if self.handle.take_cancel() {
            return Ok(Step::Done(self.complete(true)));
        }
        if end < total {
            self.handle.set_phase(RunPhase::Yielded);
            Ok(Step::Yield)
        } else {
            Ok(Step::Done(self.complete(false)))
        }
    }

    /// Drive every slice back to back without yielding.
    pub fn run_blocking(mut self) -> Result<RunStatus, ChunkError> {
        loop {
            if let Step::Done(status) = self.step()? {
                return Ok(status);
            }
        }
    }

    /// Drive the run, awaiting `yielder` between slices.
    pub async fn drive<Y>(mut self, yielder: &Y) -> Result<RunStatus, ChunkError>
    where
        Y: Yielder + ?Sized,
    {
        loop {
            match self.step()? {
                Step::Yield => yielder.yield_now().await,
                Step::Done(status) => return Ok(status),
            }
        }
    }

    /// Start the run: the first slice is processed before this returns, and
    /// the remaining slices are driven as a task on the current `LocalSet`,
    /// yielding to the Tokio scheduler between slices.
    ///
    /// A run that ends within its first slice (empty source, short-circuit,
    /// error) has already called its terminal callback when this returns and
    /// never spawns a task. Element errors without an `on_error` route are
    /// reported through `tracing::error!`.
    ///
    /// # Panics
    /// Panics if the run needs more than one slice and this is called
    /// outside of a `tokio::task::LocalSet`.
    pub fn spawn_local(mut self) -> RunHandle
    where
        T: 'static,
        V: 'static,
        P: 'static,
        P::Output: 'static,
    {
        let handle = self.handle.clone();
        let span = tracing::debug_span!("chunk_run", run_id = %handle.id(), mode = %P::MODE);

        match span.in_scope(|| self.step()) {
            Ok(Step::Yield) => {
                let run_id = handle.id();
                tokio::task::spawn_local(
                    async move {
                        HostYield.yield_now().await;
                        if let Err(err) = self.drive(&HostYield).await {
                            report_unrouted(run_id, &err);
                        }
                    }
                    .instrument(span),
                );
            }
            Ok(Step::Done(_)) => {}
            Err(err) => span.in_scope(|| report_unrouted(handle.id(), &err)),
        }
        handle
    }

    fn apply(&mut self, index: usize) -> Result<V, ChunkError> {
        let item = &self.source[index];
        let operation = &mut self.operation;
        match panic::catch_unwind(AssertUnwindSafe(|| operation(item))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(ChunkError::Operation { index, source }),
            Err(payload) => Err(ChunkError::Panicked {
                index,
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn complete(&mut self, cancelled: bool) -> RunStatus {
        let status = if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        self.status = Some(status);
        self.handle.set_phase(status.into());

        if cancelled {
            warn!(
                run_id = %self.handle.id(),
                processed = self.state.cursor,
                total = self.source.len(),
                "Run cancelled"
            );
        } else {
            info!(
                run_id = %self.handle.id(),
                mode = %P::MODE,
                processed = self.state.cursor,
                total = self.source.len(),
                "Run complete"
            );
        }

        let output = std::mem::replace(&mut self.state.accumulator, P::empty());
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(Completion { output, cancelled });
        }
        status
    }

    fn fail(&mut self, err: ChunkError) -> Result<Step, ChunkError> {
        self.status = Some(RunStatus::Errored);
        self.handle.set_phase(RunPhase::Errored);
        match self.on_error.take() {
            Some(on_error) => {
                warn!(run_id = %self.handle.id(), error = %err, "Run aborted");
                on_error(err);
                Ok(Step::Done(RunStatus::Errored))
            }
            None => Err(err),
        }
    }
}

impl<T, V, P: Policy<T, V>> std::fmt::Debug for ChunkRun<T, V, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRun")
            .field("mode", &P::MODE)
            .field("cursor", &self.state.cursor)
            .field("total", &self.source.len())
            .field("chunk_size", &self.chunk_size)
            .field("status", &self.status)
            .finish()
    }
}

fn report_unrouted(run_id: uuid::Uuid, err: &ChunkError) {
    error!(
        run_id = %run_id,
        index = err.index(),
        error = %err,
        "Unhandled failure in chunked run (no on_error callback)"
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AllSatisfy, Select, Transform, Visit};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cfg() -> ChunkerConfig {
        ChunkerConfig::default()
    }

    #[test]
    fn steps_one_slice_at_a_time() {
        let req = ChunkRequest::new()
            .source(vec![1, 2, 3, 4, 5])
            .operation(|x: &i32| x * x)
            .chunk_size(2);
        let mut run = ChunkRun::<_, _, Transform>::new(req, &cfg()).unwrap();

        assert_eq!(run.step().unwrap(), Step::Yield);
        assert_eq!(run.cursor(), 2);
        assert_eq!(run.accumulator(), &vec![1, 4]);
        assert_eq!(run.handle().phase(), RunPhase::Yielded);

        assert_eq!(run.step().unwrap(), Step::Yield);
        assert_eq!(run.step().unwrap(), Step::Done(RunStatus::Completed));
        assert_eq!(run.handle().processed(), 5);
        assert!(!run.handle().is_running());

        // Stepping again is a no-op.
        assert_eq!(run.step().unwrap(), Step::Done(RunStatus::Completed));
    }

    #[test]
    fn missing_params_rejected_before_any_work() {
        let req: ChunkRequest<i32, i32, Vec<i32>> = ChunkRequest::new().chunk_size(2);
        let err = ChunkRun::<_, _, Transform>::new(req, &cfg()).unwrap_err();
        match err {
            ConfigError::MissingParams { params, .. } => {
                assert_eq!(params, vec!["source", "operation"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let req: ChunkRequest<i32, bool, Vec<i32>> = ChunkRequest::new().source(vec![1]);
        let err = ChunkRun::<_, _, Select>::new(req, &cfg()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "chunker.filter passed a request without required params (operation)"
        );
    }

    #[test]
    fn default_chunk_size_applies_to_zero() {
        let req = ChunkRequest::new()
            .source((0..120).collect::<Vec<u32>>())
            .operation(|_: &u32| ())
            .chunk_size(0);
        let run = ChunkRun::<_, _, Visit>::new(req, &cfg()).unwrap();
        assert_eq!(run.chunk_size(), 50);
    }

    #[test]
    fn short_circuit_reports_partial_progress() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::new(RefCell::new(0));
        let result = Rc::new(RefCell::new(None));
        let (calls2, seen2, result2) = (calls.clone(), seen.clone(), result.clone());
        let req = ChunkRequest::new()
            .source(vec![2, 4, 5, 6, 8, 10])
            .operation(move |x: &i32| {
                *seen2.borrow_mut() += 1;
                x % 2 == 0
            })
            .chunk_size(4)
            .on_progress(move |done, total| calls2.borrow_mut().push((done, total)))
            .on_complete(move |c| *result2.borrow_mut() = Some(c));
        let mut run = ChunkRun::<_, _, AllSatisfy>::new(req, &cfg()).unwrap();

        assert_eq!(run.step().unwrap(), Step::Done(RunStatus::Completed));
        assert_eq!(
            result.borrow_mut().take(),
            Some(Completion {
                output: false,
                cancelled: false
            })
        );
        assert_eq!(*seen.borrow(), 3);
        assert_eq!(*calls.borrow(), vec![(3, 6)]);
    }

    #[test]
    fn panic_in_operation_becomes_chunk_error() {
        let req = ChunkRequest::new()
            .source(vec![1, 2, 3])
            .operation(|x: &i32| {
                if *x == 2 {
                    panic!("two is not allowed");
                }
                *x
            })
            .chunk_size(10);
        let run = ChunkRun::<_, _, Transform>::new(req, &cfg()).unwrap();
        let handle = run.handle();
        let err = run.run_blocking().unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.index(), 1);
        assert!(err.to_string().contains("two is not allowed"));
        assert_eq!(handle.phase(), RunPhase::Errored);
    }

    #[test]
    fn panic_in_progress_aborts_through_on_error() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let completed = Rc::new(RefCell::new(false));
        let (e, c) = (errors.clone(), completed.clone());
        let req = ChunkRequest::new()
            .source(vec![1, 2, 3, 4])
            .operation(|x: &i32| *x)
            .chunk_size(2)
            .on_progress(|_, _| panic!("progress boom"))
            .on_complete(move |_| *c.borrow_mut() = true)
            .on_error(move |err| e.borrow_mut().push(err));
        let mut run = ChunkRun::<_, _, Transform>::new(req, &cfg()).unwrap();
        let handle = run.handle();

        assert_eq!(run.step().unwrap(), Step::Done(RunStatus::Errored));
        assert_eq!(handle.phase(), RunPhase::Errored);
        assert!(!*completed.borrow());

        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ChunkError::ProgressPanicked { processed, message } => {
                assert_eq!(*processed, 2);
                assert_eq!(message, "progress boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn panic_message_from_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }
}
