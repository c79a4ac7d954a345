//! Queued item definitions

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Caller-defined metadata carried alongside a payload.
///
/// The queue never inspects it; stores serialize it as JSON and hand it back
/// unchanged to the delivery function.
pub trait Metadata: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Metadata for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// An item as handed over by a capture component, before the queue stamps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem<M> {
    pub id: String,
    pub payload: Vec<u8>,
    pub metadata: M,
}

impl<M> NewItem<M> {
    pub fn new(id: impl Into<String>, payload: Vec<u8>, metadata: M) -> Self {
        Self {
            id: id.into(),
            payload,
            metadata,
        }
    }

    /// Stamp the item for insertion into a store
    pub fn into_queued(self, enqueued_at: i64) -> QueuedItem<M> {
        QueuedItem {
            id: self.id,
            payload: self.payload,
            metadata: self.metadata,
            enqueued_at,
            retry_count: 0,
        }
    }
}

/// A persisted queue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedItem<M> {
    /// Caller-supplied unique id, primary key of the store
    pub id: String,
    /// Raw captured content
    pub payload: Vec<u8>,
    pub metadata: M,
    /// Unix milliseconds at insertion. Sole ordering key, never rewritten.
    pub enqueued_at: i64,
    /// Failed delivery attempts so far
    pub retry_count: u32,
}

impl<M> QueuedItem<M> {
    /// Whether `retry_count` has reached the eviction bound
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}
