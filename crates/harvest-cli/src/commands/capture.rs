//! Capture command - Queue a captured file
//!
//! Usage:
//! ```bash
//! harvest capture recordings/north-paddock.m4a --duration 42
//! harvest capture gate.jpg --id gate-2026-05-01
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use harvest_persist::SqliteQueueStore;
use harvest_queue::QueueStore;

use crate::capture::{is_valid_id, new_capture, CaptureKind, CaptureMetadata};

/// Arguments for the capture command
#[derive(Args)]
pub struct CaptureArgs {
    /// File holding the captured content
    pub file: PathBuf,

    /// Capture id (defaults to a random UUID). Re-using an id replaces the queued capture.
    #[arg(long)]
    pub id: Option<String>,

    /// Kind of capture (guessed from the file extension when omitted)
    #[arg(long, value_enum)]
    pub kind: Option<CaptureKind>,

    /// Recording length in seconds
    #[arg(long)]
    pub duration: Option<f64>,
}

/// Run the capture command
pub async fn run(store: &SqliteQueueStore<CaptureMetadata>, args: CaptureArgs) -> Result<()> {
    let id = args
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if !is_valid_id(&id) {
        bail!("Invalid capture id '{}': use letters, digits, '-', '_' or '.'", id);
    }

    let payload = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let item = new_capture(id, &args.file, payload, args.kind, args.duration);
    let stored = store
        .enqueue(item)
        .await
        .context("Capture could not be saved to the offline queue")?;

    crate::print_success(&format!(
        "Saved {} capture {} ({} bytes), queued for upload",
        stored.metadata.kind.as_str(),
        stored.id,
        stored.payload_len()
    ));

    Ok(())
}
