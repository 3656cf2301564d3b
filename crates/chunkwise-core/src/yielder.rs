//! `Yielder` trait: the single suspension point between slices.

use async_trait::async_trait;

/// Hands control back to the host between two slices.
#[async_trait(?Send)]
pub trait Yielder {
    async fn yield_now(&self);
}

/// Yields to the Tokio scheduler so other ready tasks on the same thread run first.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostYield;

#[async_trait(?Send)]
impl Yielder for HostYield {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }
}

/// Never suspends. Drives a run to completion deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

#[async_trait(?Send)]
impl Yielder for NoYield {
    async fn yield_now(&self) {}
}
