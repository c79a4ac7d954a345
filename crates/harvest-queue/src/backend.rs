//! Queue store trait

use async_trait::async_trait;

use crate::item::{Metadata, NewItem, QueuedItem};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The persistence layer could not complete an operation
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Another drain is already running on this processor
    #[error("A queue drain is already in progress")]
    DrainInProgress,
}

/// Durable storage of pending items.
///
/// Every operation is a single atomic read-modify-write against one key.
/// Implementations must not swallow persistence failures.
#[async_trait]
pub trait QueueStore<M: Metadata>: Send + Sync {
    /// Stamp `enqueued_at = now`, `retry_count = 0` and persist.
    /// Re-using an id overwrites the previous record.
    /// Resolves only once the record is durable.
    async fn enqueue(&self, item: NewItem<M>) -> Result<QueuedItem<M>, QueueError>;

    /// All pending items, oldest first (ties in insertion order)
    async fn list_all(&self) -> Result<Vec<QueuedItem<M>>, QueueError>;

    async fn get(&self, id: &str) -> Result<Option<QueuedItem<M>>, QueueError>;

    /// Delete a record. Returns whether one existed; absence is not an error.
    async fn remove(&self, id: &str) -> Result<bool, QueueError>;

    /// Bump `retry_count` and return the new value, `None` if the id is gone
    async fn increment_retry(&self, id: &str) -> Result<Option<u32>, QueueError>;

    async fn count(&self) -> Result<usize, QueueError>;

    /// Drop every pending item. Administrative use only.
    async fn clear(&self) -> Result<(), QueueError>;
}
