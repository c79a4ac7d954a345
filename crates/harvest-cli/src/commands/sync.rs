//! Sync command - Upload pending captures
//!
//! Usage:
//! ```bash
//! harvest sync --endpoint https://farm.example.com/api
//! harvest sync --endpoint http://10.0.0.2:8080 --save-evicted ./lost
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harvest_persist::SqliteQueueStore;
use harvest_queue::{ProcessorConfig, QueueProcessor, QueuedItem};

use crate::capture::CaptureMetadata;
use crate::upload::HttpDelivery;

/// Arguments for the sync command
#[derive(Args)]
pub struct SyncArgs {
    /// Base URL of the upload API
    #[arg(long, env = "HARVEST_UPLOAD_URL")]
    pub endpoint: String,

    /// Per-upload timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Failed uploads before a capture is evicted (default: HARVEST_MAX_RETRIES or 3)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Write the content of evicted captures to this directory
    #[arg(long)]
    pub save_evicted: Option<PathBuf>,
}

/// Run the sync command
pub async fn run(store: SqliteQueueStore<CaptureMetadata>, args: SyncArgs) -> Result<()> {
    let mut config = ProcessorConfig::from_env();
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }

    let delivery = HttpDelivery::new(&args.endpoint, Duration::from_secs(args.timeout_secs))
        .context("Failed to build HTTP client")?;
    let processor = QueueProcessor::new(store, config);

    let report = processor
        .process_queue_with_progress(&delivery, |current, total| {
            print!("\r  Uploading {}/{}", current, total);
            let _ = std::io::stdout().flush();
        })
        .await?;

    if report.attempted() > 0 {
        println!();
    }

    crate::print_info(&format!(
        "{} uploaded, {} failed",
        report.success_count.to_string().green(),
        report.failed_count.to_string().yellow()
    ));

    report_evictions(&report.evicted, args.save_evicted.as_deref()).await
}

/// Tell the user about every evicted capture, then try to save each one.
///
/// The store no longer holds these items, so one failed save must not stop
/// the others from being reported or written.
pub async fn report_evictions(
    evicted: &[QueuedItem<CaptureMetadata>],
    save_dir: Option<&Path>,
) -> Result<()> {
    for item in evicted {
        crate::print_warning(&format!(
            "Capture {} ({}) was dropped after {} failed uploads",
            item.id, item.metadata.filename, item.retry_count
        ));
    }

    let Some(dir) = save_dir else {
        return Ok(());
    };

    let mut unsaved = Vec::new();
    for item in evicted {
        match save_evicted(dir, item).await {
            Ok(path) => crate::print_info(&format!("Content kept at {}", path.display())),
            Err(e) => {
                tracing::error!(item_id = %item.id, "Evicted capture not saved: {:#}", e);
                crate::print_warning(&format!("Capture {} could not be saved: {:#}", item.id, e));
                unsaved.push(item.id.as_str());
            }
        }
    }

    if !unsaved.is_empty() {
        bail!(
            "{} evicted capture(s) could not be saved: {}",
            unsaved.len(),
            unsaved.join(", ")
        );
    }

    Ok(())
}

async fn save_evicted(dir: &Path, item: &QueuedItem<CaptureMetadata>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(format!("{}-{}", item.id, item.metadata.filename));
    tokio::fs::write(&path, &item.payload)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}
