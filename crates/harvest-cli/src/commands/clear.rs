//! Clear command - Drop every pending capture

use anyhow::{bail, Result};
use clap::Args;

use harvest_persist::SqliteQueueStore;
use harvest_queue::QueueStore;

use crate::capture::CaptureMetadata;

/// Arguments for the clear command
#[derive(Args)]
pub struct ClearArgs {
    /// Confirm that pending captures will be lost
    #[arg(long)]
    pub yes: bool,
}

/// Run the clear command
pub async fn run(store: &SqliteQueueStore<CaptureMetadata>, args: ClearArgs) -> Result<()> {
    let pending = store.count().await?;
    if !args.yes {
        bail!(
            "Refusing to drop {} pending capture(s) without --yes",
            pending
        );
    }

    store.clear().await?;
    crate::print_warning(&format!("Dropped {} pending capture(s)", pending));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_queue::NewItem;

    use crate::capture::new_capture;
    use crate::test_support::open_store;

    fn note(id: &str) -> NewItem<CaptureMetadata> {
        new_capture(
            id.to_string(),
            std::path::Path::new("note.txt"),
            b"gate left open".to_vec(),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.enqueue(note("a")).await.unwrap();
        store.enqueue(note("b")).await.unwrap();

        let err = run(&store, ClearArgs { yes: false }).await.unwrap_err();
        assert!(err.to_string().contains("without --yes"));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_with_confirmation_drops_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.enqueue(note("a")).await.unwrap();

        run(&store, ClearArgs { yes: true }).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
