//! Status and list commands - Inspect the pending queue

use anyhow::Result;
use chrono::DateTime;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use harvest_persist::SqliteQueueStore;
use harvest_queue::{ProcessorConfig, QueueStore};

use crate::capture::CaptureMetadata;

/// Print the number of pending captures
pub async fn count(store: &SqliteQueueStore<CaptureMetadata>) -> Result<()> {
    let pending = store.count().await?;
    if pending == 0 {
        crate::print_success("All captures uploaded");
    } else {
        crate::print_info(&format!("{} capture(s) waiting for upload", pending));
    }
    Ok(())
}

/// Print pending captures, oldest first
pub async fn list(store: &SqliteQueueStore<CaptureMetadata>) -> Result<()> {
    let items = store.list_all().await?;

    println!("{}", "Pending captures".bold().cyan());
    println!();

    if items.is_empty() {
        println!("  {}", "(none)".dimmed());
        return Ok(());
    }

    let max_retries = ProcessorConfig::from_env().max_retries;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Kind").fg(Color::Cyan),
            Cell::new("File").fg(Color::Cyan),
            Cell::new("Bytes").fg(Color::Cyan),
            Cell::new("Queued").fg(Color::Cyan),
            Cell::new("Retries").fg(Color::Cyan),
        ]);

    for item in &items {
        let queued = DateTime::from_timestamp_millis(item.enqueued_at)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| item.enqueued_at.to_string());

        let retries = Cell::new(format!("{}/{}", item.retry_count, max_retries));
        let retries = if item.retry_count > 0 {
            retries.fg(Color::Yellow)
        } else {
            retries
        };

        table.add_row(vec![
            Cell::new(&item.id),
            Cell::new(item.metadata.kind.as_str()),
            Cell::new(&item.metadata.filename),
            Cell::new(item.payload_len()),
            Cell::new(queued),
            retries,
        ]);
    }

    println!("{table}");
    Ok(())
}
