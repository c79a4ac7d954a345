//! SQLite connection setup

use harvest_queue::QueueError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite configuration options
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database URL (e.g., "sqlite:harvest.db" or "sqlite::memory:")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Enable WAL journal mode
    pub wal_mode: bool,
    /// fsync on every commit so an acknowledged enqueue survives power loss
    pub synchronous_full: bool,
    /// Busy timeout in seconds
    pub busy_timeout_secs: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:harvest.db".to_string(),
            max_connections: 4,
            wal_mode: true,
            synchronous_full: true,
            busy_timeout_secs: 30,
        }
    }
}

impl SqliteConfig {
    /// Create config for in-memory database (testing)
    pub fn memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            wal_mode: false,
            synchronous_full: false,
            busy_timeout_secs: 5,
        }
    }

    /// Create config for a database file, created on first use
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            url: format!("sqlite://{}", path.as_ref().display()),
            ..Default::default()
        }
    }

    /// Load from environment (`HARVEST_DB_URL`)
    pub fn from_env() -> Self {
        match std::env::var("HARVEST_DB_URL") {
            Ok(url) => Self {
                url,
                ..Default::default()
            },
            Err(_) => Self::default(),
        }
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Open a pool and bring the schema up to date
pub async fn connect(config: &SqliteConfig) -> Result<SqlitePool, QueueError> {
    let mut options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| QueueError::StorageUnavailable(e.to_string()))?
        .create_if_missing(true);

    options = options.pragma("busy_timeout", config.busy_timeout_secs.saturating_mul(1000).to_string());

    if config.wal_mode {
        options = options.pragma("journal_mode", "WAL");
    }
    if config.synchronous_full {
        options = options.pragma("synchronous", "FULL");
    }

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);

    // Each in-memory connection is its own database; never let the pool recycle it
    if config.is_memory() {
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .acquire_timeout(Duration::from_secs(u64::from(config.busy_timeout_secs)))
        .connect_with(options)
        .await
        .map_err(|e| QueueError::StorageUnavailable(e.to_string()))?;

    info!(
        url = %config.url,
        wal = config.wal_mode,
        synchronous_full = config.synchronous_full,
        "Connected to SQLite"
    );

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| QueueError::StorageUnavailable(format!("Migration failed: {}", e)))?;

    Ok(pool)
}
