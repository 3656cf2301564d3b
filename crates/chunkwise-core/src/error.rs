//! Error types for the chunked iteration pipeline.

use thiserror::Error;

use crate::policy::Mode;

/// Boxed error returned by fallible per-element operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors detected synchronously, before any slice is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunker.{mode} passed a request without required params ({})", .params.join(", "))]
    MissingParams {
        mode: Mode,
        params: Vec<&'static str>,
    },

    #[error("Invalid chunk size: {value} (must be a positive integer)")]
    InvalidChunkSize { value: usize },
}

/// Errors raised while applying the operation to an element.
///
/// These surface asynchronously, during a later slice step, and are routed
/// to the run's `on_error` callback when one is registered.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Operation failed at index {index}: {source}")]
    Operation {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("Operation panicked at index {index}: {message}")]
    Panicked { index: usize, message: String },

    #[error("on_progress panicked after {processed} elements: {message}")]
    ProgressPanicked { processed: usize, message: String },
}

impl ChunkError {
    /// Index of the element that was being processed when the error occurred.
    /// For a progress callback failure, the last element of the finished slice.
    pub fn index(&self) -> usize {
        match self {
            Self::Operation { index, .. } | Self::Panicked { index, .. } => *index,
            Self::ProgressPanicked { processed, .. } => processed.saturating_sub(1),
        }
    }

    /// Returns `true` if user code panicked rather than returning `Err`.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. } | Self::ProgressPanicked { .. })
    }
}
