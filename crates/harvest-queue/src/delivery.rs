//! Delivery seam between the queue and the upload transport

use async_trait::async_trait;
use std::future::Future;

use crate::item::{Metadata, QueuedItem};

/// Why a single delivery attempt did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The receiving side answered but refused the item
    #[error("Delivery rejected: {0}")]
    Rejected(String),
    /// The item never reached the receiving side
    #[error("Transport error: {0}")]
    Transport(String),
    /// The delivery function panicked
    #[error("Delivery panicked: {0}")]
    Panicked(String),
}

/// Pushes one item to its destination.
///
/// Implementations must be idempotent per `item.id`: the queue only
/// guarantees at-least-once delivery. Any timeout policy belongs here.
#[async_trait]
pub trait Deliver<M: Metadata>: Send + Sync {
    async fn deliver(&self, item: &QueuedItem<M>) -> Result<(), DeliveryError>;
}

/// Adapter turning an async closure into a [`Deliver`]
pub struct DeliveryFn<F> {
    f: F,
}

/// Wrap a closure receiving an owned copy of each item
pub fn delivery_fn<M, F, Fut>(f: F) -> DeliveryFn<F>
where
    M: Metadata,
    F: Fn(QueuedItem<M>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DeliveryError>> + Send,
{
    DeliveryFn { f }
}

#[async_trait]
impl<M, F, Fut> Deliver<M> for DeliveryFn<F>
where
    M: Metadata,
    F: Fn(QueuedItem<M>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DeliveryError>> + Send,
{
    async fn deliver(&self, item: &QueuedItem<M>) -> Result<(), DeliveryError> {
        (self.f)(item.clone()).await
    }
}
