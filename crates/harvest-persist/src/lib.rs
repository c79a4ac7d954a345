//! # Harvest Persistence
//!
//! Durable storage for the offline capture queue.
//!
//! Supports:
//! - SQLite file databases (on-device queue)
//! - SQLite in-memory databases (for testing)

pub mod queue;
pub mod sqlite;

pub use queue::SqliteQueueStore;
pub use sqlite::{connect, SqliteConfig};
