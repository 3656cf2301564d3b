//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Slice size used when neither the request nor the config sets one.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Settings shared by every run started from one `Chunker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Elements processed per synchronous slice when a request leaves it unset.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkerConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Reject settings that could never drive a run forward.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize {
                value: self.chunk_size,
            });
        }
        Ok(())
    }

    /// Resolve a per-request override. Missing or zero values fall back.
    pub fn effective_chunk_size(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(n) if n > 0 => n,
            _ if self.chunk_size > 0 => self.chunk_size,
            _ => DEFAULT_CHUNK_SIZE,
        }
    }
}
