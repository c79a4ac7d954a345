//! Queue processor: drains a store through a delivery function

use futures::FutureExt;
use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{QueueError, QueueStore};
use crate::delivery::{Deliver, DeliveryError};
use crate::item::{Metadata, QueuedItem};

/// Failed attempts after which an item is evicted
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Eviction bound. An item is dropped once its retry count reaches this.
    pub max_retries: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ProcessorConfig {
    /// Load from environment (`HARVEST_MAX_RETRIES`)
    pub fn from_env() -> Self {
        Self {
            max_retries: std::env::var("HARVEST_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
        }
    }
}

/// Outcome of one drain
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport<M> {
    pub success_count: usize,
    pub failed_count: usize,
    /// Items dropped during this drain after exhausting their retries.
    /// Their content is gone from the store; this is the last copy.
    pub evicted: Vec<QueuedItem<M>>,
}

impl<M> DrainReport<M> {
    fn empty() -> Self {
        Self {
            success_count: 0,
            failed_count: 0,
            evicted: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.success_count + self.failed_count
    }

    pub fn has_evictions(&self) -> bool {
        !self.evicted.is_empty()
    }
}

pub struct QueueProcessor<M, S: ?Sized> {
    store: Arc<S>,
    config: ProcessorConfig,
    /// Held for the whole drain
    draining: Mutex<()>,
    _metadata: PhantomData<fn() -> M>,
}

impl<M: Metadata, S: QueueStore<M> + 'static> QueueProcessor<M, S> {
    pub fn new(store: S, config: ProcessorConfig) -> Self {
        Self::new_with_arc(Arc::new(store), config)
    }
}

impl<M: Metadata, S: QueueStore<M> + ?Sized + 'static> QueueProcessor<M, S> {
    /// Create a processor over a shared store (supports dyn dispatch)
    pub fn new_with_arc(store: Arc<S>, config: ProcessorConfig) -> Self {
        Self {
            store,
            config,
            draining: Mutex::new(()),
            _metadata: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> ProcessorConfig {
        self.config
    }

    pub async fn process_queue<D>(&self, deliver: &D) -> Result<DrainReport<M>, QueueError>
    where
        D: Deliver<M> + ?Sized,
    {
        self.process_queue_with_progress(deliver, |_, _| {}).await
    }

    /// Attempt every item pending at call time, oldest first, one at a time.
    ///
    /// `on_progress(current, total)` fires before each attempt; `total` is
    /// the size of the snapshot taken at the start. Items enqueued during the
    /// drain wait for the next call. Storage errors abort the drain.
    /// Returns [`QueueError::DrainInProgress`] if another drain holds the guard.
    pub async fn process_queue_with_progress<D, P>(
        &self,
        deliver: &D,
        mut on_progress: P,
    ) -> Result<DrainReport<M>, QueueError>
    where
        D: Deliver<M> + ?Sized,
        P: FnMut(usize, usize) + Send,
    {
        let _guard = self
            .draining
            .try_lock()
            .map_err(|_| QueueError::DrainInProgress)?;

        let snapshot = self.store.list_all().await?;
        let total = snapshot.len();
        let mut report = DrainReport::empty();

        if total == 0 {
            debug!("Queue empty, nothing to drain");
            return Ok(report);
        }

        info!(total = total, "Draining queue");

        for (index, mut item) in snapshot.into_iter().enumerate() {
            on_progress(index + 1, total);

            match attempt(deliver, &item).await {
                Ok(()) => {
                    self.store.remove(&item.id).await?;
                    report.success_count += 1;
                    debug!(item_id = %item.id, "Delivered item");
                }
                Err(e) => {
                    report.failed_count += 1;

                    let Some(retries) = self.store.increment_retry(&item.id).await? else {
                        debug!(item_id = %item.id, "Item removed while delivery was in flight");
                        continue;
                    };

                    if retries >= self.config.max_retries {
                        self.store.remove(&item.id).await?;
                        item.retry_count = retries;
                        warn!(
                            item_id = %item.id,
                            retries = retries,
                            payload_bytes = item.payload_len(),
                            error = %e,
                            "Evicting item after exhausting retries, content dropped from queue"
                        );
                        report.evicted.push(item);
                    } else {
                        info!(
                            item_id = %item.id,
                            attempt = retries,
                            max_retries = self.config.max_retries,
                            error = %e,
                            "Delivery failed, item kept for next drain"
                        );
                    }
                }
            }
        }

        info!(
            success = report.success_count,
            failed = report.failed_count,
            evicted = report.evicted.len(),
            "Queue drain finished"
        );

        Ok(report)
    }
}

/// Run one delivery, turning a panic into an ordinary failure
async fn attempt<M, D>(deliver: &D, item: &QueuedItem<M>) -> Result<(), DeliveryError>
where
    M: Metadata,
    D: Deliver<M> + ?Sized,
{
    match AssertUnwindSafe(deliver.deliver(item)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(DeliveryError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
