//! In-memory queue store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::{QueueError, QueueStore};
use crate::clock::{Clock, SystemClock};
use crate::item::{Metadata, NewItem, QueuedItem};

#[derive(Debug)]
struct Slot<M> {
    /// Insertion sequence, breaks ties between equal timestamps
    seq: u64,
    item: QueuedItem<M>,
}

#[derive(Debug)]
struct Inner<M> {
    items: HashMap<String, Slot<M>>,
    next_seq: u64,
}

/// Non-durable store with the same semantics as the SQLite store
pub struct MemoryStore<M> {
    inner: Arc<RwLock<Inner<M>>>,
    clock: Arc<dyn Clock>,
}

impl<M> MemoryStore<M> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                items: HashMap::new(),
                next_seq: 0,
            })),
            clock,
        }
    }
}

impl<M> Default for MemoryStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Metadata> QueueStore<M> for MemoryStore<M> {
    async fn enqueue(&self, item: NewItem<M>) -> Result<QueuedItem<M>, QueueError> {
        let queued = item.into_queued(self.clock.now_millis());

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.items.insert(
            queued.id.clone(),
            Slot {
                seq,
                item: queued.clone(),
            },
        );

        tracing::debug!(item_id = %queued.id, enqueued_at = queued.enqueued_at, "Enqueued item");
        Ok(queued)
    }

    async fn list_all(&self) -> Result<Vec<QueuedItem<M>>, QueueError> {
        let inner = self.inner.read().await;
        let mut slots: Vec<&Slot<M>> = inner.items.values().collect();
        slots.sort_by_key(|slot| (slot.item.enqueued_at, slot.seq));
        Ok(slots.into_iter().map(|slot| slot.item.clone()).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedItem<M>>, QueueError> {
        let inner = self.inner.read().await;
        Ok(inner.items.get(id).map(|slot| slot.item.clone()))
    }

    async fn remove(&self, id: &str) -> Result<bool, QueueError> {
        let mut inner = self.inner.write().await;
        Ok(inner.items.remove(id).is_some())
    }

    async fn increment_retry(&self, id: &str) -> Result<Option<u32>, QueueError> {
        let mut inner = self.inner.write().await;
        Ok(inner.items.get_mut(id).map(|slot| {
            slot.item.retry_count += 1;
            slot.item.retry_count
        }))
    }

    async fn count(&self) -> Result<usize, QueueError> {
        Ok(self.inner.read().await.items.len())
    }

    async fn clear(&self) -> Result<(), QueueError> {
        self.inner.write().await.items.clear();
        Ok(())
    }
}
