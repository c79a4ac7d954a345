use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::marker::PhantomData;
use std::sync::Arc;

use harvest_queue::{Clock, Metadata, NewItem, QueueError, QueueStore, QueuedItem, SystemClock};

use crate::sqlite::{connect, SqliteConfig};

/// Durable queue store using SQLite
pub struct SqliteQueueStore<M> {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    _metadata: PhantomData<fn() -> M>,
}

impl<M: Metadata> SqliteQueueStore<M> {
    /// Wrap a pool whose schema is already migrated (see [`connect`])
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            _metadata: PhantomData,
        }
    }

    /// Connect, migrate and wrap in one step
    pub async fn open(config: &SqliteConfig) -> Result<Self, QueueError> {
        Ok(Self::new(connect(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn decode(row: &SqliteRow) -> Result<QueuedItem<M>, QueueError> {
        let id: String = row.try_get("id").map_err(storage)?;
        let payload: Vec<u8> = row.try_get("payload").map_err(storage)?;
        let metadata: String = row.try_get("metadata").map_err(storage)?;
        let enqueued_at: i64 = row.try_get("enqueued_at").map_err(storage)?;
        let retry_count: i64 = row.try_get("retry_count").map_err(storage)?;

        let metadata = serde_json::from_str(&metadata).map_err(|e| {
            QueueError::StorageUnavailable(format!("Corrupt metadata for item {}: {}", id, e))
        })?;

        Ok(QueuedItem {
            id,
            payload,
            metadata,
            enqueued_at,
            retry_count: to_u32(retry_count)?,
        })
    }
}

fn storage(e: sqlx::Error) -> QueueError {
    QueueError::StorageUnavailable(e.to_string())
}

fn to_u32(value: i64) -> Result<u32, QueueError> {
    u32::try_from(value)
        .map_err(|_| QueueError::StorageUnavailable(format!("Retry count out of range: {}", value)))
}

#[async_trait]
impl<M: Metadata> QueueStore<M> for SqliteQueueStore<M> {
    async fn enqueue(&self, item: NewItem<M>) -> Result<QueuedItem<M>, QueueError> {
        let queued = item.into_queued(self.clock.now_millis());
        let metadata = serde_json::to_string(&queued.metadata)?;

        // Autocommit; returns after the write is synced
        sqlx::query(
            "INSERT OR REPLACE INTO queue_items (id, payload, metadata, enqueued_at, retry_count) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(&queued.id)
        .bind(&queued.payload)
        .bind(metadata)
        .bind(queued.enqueued_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        tracing::debug!(
            item_id = %queued.id,
            enqueued_at = queued.enqueued_at,
            payload_bytes = queued.payload.len(),
            "Persisted queue item"
        );

        Ok(queued)
    }

    async fn list_all(&self) -> Result<Vec<QueuedItem<M>>, QueueError> {
        let rows = sqlx::query(
            "SELECT id, payload, metadata, enqueued_at, retry_count FROM queue_items ORDER BY enqueued_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        // Undecodable rows stay in the table but must not block the rest of the queue
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::decode(row) {
                Ok(item) => items.push(item),
                Err(e) => {
                    let id: Option<String> = row.try_get("id").ok();
                    tracing::warn!(
                        item_id = id.as_deref().unwrap_or("<unreadable>"),
                        error = %e,
                        "Skipping undecodable queue row"
                    );
                }
            }
        }
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedItem<M>>, QueueError> {
        let row = sqlx::query(
            "SELECT id, payload, metadata, enqueued_at, retry_count FROM queue_items WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn remove(&self, id: &str) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM queue_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_retry(&self, id: &str) -> Result<Option<u32>, QueueError> {
        let row = sqlx::query(
            "UPDATE queue_items SET retry_count = retry_count + 1 WHERE id = ? RETURNING retry_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => {
                let retries: i64 = row.try_get("retry_count").map_err(storage)?;
                Ok(Some(to_u32(retries)?))
            }
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<usize, QueueError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM queue_items")
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let n: i64 = row.try_get("n").map_err(storage)?;
        usize::try_from(n)
            .map_err(|_| QueueError::StorageUnavailable(format!("Row count out of range: {}", n)))
    }

    async fn clear(&self) -> Result<(), QueueError> {
        let result = sqlx::query("DELETE FROM queue_items")
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        tracing::info!(removed = result.rows_affected(), "Cleared capture queue");
        Ok(())
    }
}
