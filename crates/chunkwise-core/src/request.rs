//! Run request builder.

use std::sync::Arc;

use crate::error::{BoxError, ChunkError};

pub(crate) type OperationFn<T, V> = Box<dyn FnMut(&T) -> Result<V, BoxError>>;
pub(crate) type CompleteFn<O> = Box<dyn FnOnce(Completion<O>)>;
pub(crate) type ProgressFn = Box<dyn FnMut(usize, usize)>;
pub(crate) type ErrorFn = Box<dyn FnOnce(ChunkError)>;

/// Payload handed to `on_complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<O> {
    /// Output accumulated by the mode policy.
    pub output: O,
    /// `true` when the run stopped early because of a cancellation request.
    pub cancelled: bool,
}

impl<O> Completion<O> {
    pub fn into_output(self) -> O {
        self.output
    }
}

/// Configuration for one run.
///
/// `T` is the element type, `V` what the operation returns per element and
/// `O` the output of the mode the request is submitted to.
///
/// The source is shared as `Arc<[T]>`, so it stays read-only for the whole run.
pub struct ChunkRequest<T, V, O> {
    pub(crate) source: Option<Arc<[T]>>,
    pub(crate) operation: Option<OperationFn<T, V>>,
    pub(crate) chunk_size: Option<usize>,
    pub(crate) on_complete: Option<CompleteFn<O>>,
    pub(crate) on_progress: Option<ProgressFn>,
    pub(crate) on_error: Option<ErrorFn>,
}

impl<T, V, O> ChunkRequest<T, V, O> {
    pub fn new() -> Self {
        Self {
            source: None,
            operation: None,
            chunk_size: None,
            on_complete: None,
            on_progress: None,
            on_error: None,
        }
    }

    /// Sequence to iterate. Required.
    pub fn source(mut self, source: impl Into<Arc<[T]>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Infallible per-element function. Required (or `try_operation`).
    pub fn operation<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(&T) -> V + 'static,
    {
        self.operation = Some(Box::new(move |item: &T| -> Result<V, BoxError> { Ok(f(item)) }));
        self
    }

    /// Fallible per-element function. An `Err` aborts the run.
    pub fn try_operation<F, E>(mut self, mut f: F) -> Self
    where
        F: FnMut(&T) -> Result<V, E> + 'static,
        E: Into<BoxError>,
    {
        self.operation = Some(Box::new(move |item: &T| -> Result<V, BoxError> {
            f(item).map_err(Into::into)
        }));
        self
    }

    /// Elements per slice. `0` means "use the default".
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Completion<O>) + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called after each slice with `(processed, total)`.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, usize) + 'static,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Receives the first element error. Without it the error is logged and
    /// returned from the driver instead.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ChunkError) + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl<T, V, O> Default for ChunkRequest<T, V, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V, O> std::fmt::Debug for ChunkRequest<T, V, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRequest")
            .field("source_len", &self.source.as_ref().map(|s| s.len()))
            .field("has_operation", &self.operation.is_some())
            .field("chunk_size", &self.chunk_size)
            .field("has_on_complete", &self.on_complete.is_some())
            .field("has_on_progress", &self.on_progress.is_some())
            .field("has_on_error", &self.on_error.is_some())
            .finish()
    }
}
