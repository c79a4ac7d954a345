use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use harvest_persist::{connect, SqliteConfig, SqliteQueueStore};
use harvest_queue::{
    delivery_fn, DeliveryError, ManualClock, NewItem, ProcessorConfig, QueueError,
    QueueProcessor, QueueStore, QueuedItem,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct VoiceMeta {
    captured_at: String,
    duration_secs: f64,
    filename: String,
}

fn voice(id: &str) -> NewItem<VoiceMeta> {
    NewItem::new(
        id,
        format!("opus:{id}").into_bytes(),
        VoiceMeta {
            captured_at: "2026-05-01T07:30:00Z".to_string(),
            duration_secs: 8.0,
            filename: format!("{id}.ogg"),
        },
    )
}

#[tokio::test]
async fn test_enqueued_items_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = SqliteConfig::file(dir.path().join("queue.db"));

    {
        let store: SqliteQueueStore<VoiceMeta> = SqliteQueueStore::open(&config).await?;
        store.enqueue(voice("rec-1")).await?;
        store.enqueue(voice("rec-2")).await?;
        store.pool().close().await;
    }

    let reopened: SqliteQueueStore<VoiceMeta> = SqliteQueueStore::open(&config).await?;
    let items = reopened.list_all().await?;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "rec-1");
    assert_eq!(items[0].metadata.filename, "rec-1.ogg");
    assert_eq!(items[1].payload, b"opus:rec-2".to_vec());

    Ok(())
}

#[tokio::test]
async fn test_retry_counts_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = SqliteConfig::file(dir.path().join("queue.db"));
    let failing = delivery_fn(|_item: QueuedItem<VoiceMeta>| async {
        Err::<(), _>(DeliveryError::Transport("offline".to_string()))
    });

    // One failing drain per "app session"; the third evicts
    for session in 1..=3u32 {
        let store: SqliteQueueStore<VoiceMeta> = SqliteQueueStore::open(&config).await?;
        if session == 1 {
            store.enqueue(voice("rec-1")).await?;
        }
        let pool = store.pool().clone();
        let processor = QueueProcessor::new(store, ProcessorConfig::default());

        let report = processor.process_queue(&failing).await?;
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.has_evictions(), session == 3);

        pool.close().await;
    }

    let store: SqliteQueueStore<VoiceMeta> = SqliteQueueStore::open(&config).await?;
    assert_eq!(store.count().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_drain_scenario_over_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let clock = Arc::new(ManualClock::new(100));
    let pool = connect(&SqliteConfig::memory()).await?;
    let store: SqliteQueueStore<Value> = SqliteQueueStore::with_clock(pool, clock.clone());

    store.enqueue(NewItem::new("A", b"a".to_vec(), json!({}))).await?;
    clock.set(200);
    store.enqueue(NewItem::new("B", b"b".to_vec(), json!({}))).await?;

    let processor = QueueProcessor::new(store, ProcessorConfig::default());
    let uplink = delivery_fn(|item: QueuedItem<Value>| async move {
        if item.id == "A" {
            Err(DeliveryError::Rejected("500".to_string()))
        } else {
            Ok(())
        }
    });

    let report = processor.process_queue(&uplink).await?;
    assert_eq!(report.success_count, 1);
    assert_eq!(report.failed_count, 1);

    let remaining = processor.store().list_all().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "A");
    assert_eq!(remaining[0].retry_count, 1);
    assert_eq!(remaining[0].enqueued_at, 100);

    Ok(())
}

#[tokio::test]
async fn test_closed_pool_reports_storage_unavailable() -> Result<(), Box<dyn std::error::Error>> {
    let store: SqliteQueueStore<Value> = SqliteQueueStore::open(&SqliteConfig::memory()).await?;
    store.pool().close().await;

    let err = store
        .enqueue(NewItem::new("rec-1", Vec::new(), json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::StorageUnavailable(_)));

    let err = store.count().await.unwrap_err();
    assert!(matches!(err, QueueError::StorageUnavailable(_)));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_database_path_fails_to_open() {
    let config = SqliteConfig::file("/nonexistent-dir/deeper/queue.db");
    let result: Result<SqliteQueueStore<Value>, _> = SqliteQueueStore::open(&config).await;
    assert!(matches!(result, Err(QueueError::StorageUnavailable(_))));
}

#[tokio::test]
async fn test_undecodable_row_does_not_block_drain() -> Result<(), Box<dyn std::error::Error>> {
    let clock = Arc::new(ManualClock::new(500));
    let pool = connect(&SqliteConfig::memory()).await?;
    let store: SqliteQueueStore<VoiceMeta> = SqliteQueueStore::with_clock(pool.clone(), clock);

    // Row left behind by an older metadata layout, older than the valid capture
    sqlx::query(
        "INSERT INTO queue_items (id, payload, metadata, enqueued_at, retry_count) VALUES (?, ?, ?, ?, 0)",
    )
    .bind("legacy")
    .bind(b"old".to_vec())
    .bind(r#"{"old":1}"#)
    .bind(100_i64)
    .execute(&pool)
    .await?;
    store.enqueue(voice("rec-1")).await?;

    let items = store.list_all().await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "rec-1");

    let err = store.get("legacy").await.unwrap_err();
    assert!(matches!(err, QueueError::StorageUnavailable(_)));

    let processor = QueueProcessor::new(store, ProcessorConfig::default());
    let uplink = delivery_fn(|_item: QueuedItem<VoiceMeta>| async { Ok::<(), DeliveryError>(()) });
    let report = processor.process_queue(&uplink).await?;
    assert_eq!(report.success_count, 1);
    assert_eq!(report.failed_count, 0);

    // The bad row is kept for inspection, not silently deleted
    assert_eq!(processor.store().count().await?, 1);
    assert!(processor.store().get("rec-1").await?.is_none());

    Ok(())
}
