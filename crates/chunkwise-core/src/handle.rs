//! `RunHandle`: per-run cancellation and status.
//!
//! Every run owns its own handle; there is no shared module-level flag, so
//! any number of runs can be in flight and cancelled independently.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use uuid::Uuid;

use crate::policy::Mode;
use crate::state::RunPhase;

struct HandleInner {
    id: Uuid,
    mode: Mode,
    total: usize,
    phase: AtomicU8,
    processed: AtomicUsize,
    cancel_requested: AtomicBool,
    finished: Notify,
}

/// Cheaply cloneable handle to one run.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<HandleInner>,
}

impl RunHandle {
    pub(crate) fn new(mode: Mode, total: usize) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::new_v4(),
                mode,
                total,
                phase: AtomicU8::new(RunPhase::Validating.as_u8()),
                processed: AtomicUsize::new(0),
                cancel_requested: AtomicBool::new(false),
                finished: Notify::new(),
            }),
        }
    }

    /// Unique id of this run (also attached to its log records).
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    /// Length of the source sequence.
    pub fn total(&self) -> usize {
        self.inner.total
    }

    /// Number of elements processed so far.
    pub fn processed(&self) -> usize {
        self.inner.processed.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.inner.phase.load(Ordering::Acquire))
    }

    /// Returns `true` until the run completes, is cancelled, or errors.
    pub fn is_running(&self) -> bool {
        !self.phase().is_terminal()
    }

    /// Request cancellation at the next slice boundary.
    ///
    /// Returns `false` (and does nothing) if the run has already ended.
    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.inner.cancel_requested.store(true, Ordering::Release);
        tracing::debug!(run_id = %self.inner.id, "Cancellation requested");
        true
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel_requested.load(Ordering::Acquire)
    }

    /// Resolves once the run has reached a terminal phase.
    pub async fn finished(&self) {
        loop {
            let notified = self.inner.finished.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn set_phase(&self, phase: RunPhase) {
        self.inner.phase.store(phase.as_u8(), Ordering::Release);
        if phase.is_terminal() {
            self.inner.finished.notify_waiters();
        }
    }

    pub(crate) fn set_processed(&self, processed: usize) {
        self.inner.processed.store(processed, Ordering::Release);
    }

    /// Consume a pending cancellation request, resetting the flag.
    pub(crate) fn take_cancel(&self) -> bool {
        self.inner.cancel_requested.swap(false, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.inner.id)
            .field("mode", &self.inner.mode)
            .field("phase", &self.phase())
            .field("processed", &self.processed())
            .field("total", &self.inner.total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_noop_after_terminal_phase() {
        let h = RunHandle::new(Mode::Visit, 10);
        h.set_phase(RunPhase::Completed);
        assert!(!h.cancel());
        assert!(!h.is_cancel_requested());
    }

    #[test]
    fn take_cancel_resets_flag() {
        let h = RunHandle::new(Mode::Transform, 3);
        h.set_phase(RunPhase::Yielded);
        assert!(h.cancel());
        assert!(h.take_cancel());
        assert!(!h.take_cancel());
    }

    #[test]
    fn handles_are_independent() {
        let a = RunHandle::new(Mode::Select, 1);
        let b = RunHandle::new(Mode::Select, 1);
        assert_ne!(a.id(), b.id());
        a.cancel();
        assert!(a.is_cancel_requested());
        assert!(!b.is_cancel_requested());
    }

    #[tokio::test]
    async fn finished_resolves_after_terminal_phase() {
        let h = RunHandle::new(Mode::Visit, 0);
        let waiter = h.clone();
        let task = tokio::spawn(async move { waiter.finished().await });
        tokio::task::yield_now().await;
        h.set_phase(RunPhase::Cancelled);
        task.await.unwrap();
        assert_eq!(h.phase(), RunPhase::Cancelled);
    }
}
