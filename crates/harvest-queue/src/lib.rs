//! # Harvest Queue
//!
//! Durable offline queue for field captures (voice notes, photos, notes).
//!
//! Features:
//! - Generic `QueuedItem<M>` carrying opaque payload bytes and caller metadata
//! - Pluggable store (`MemoryStore` here, SQLite in `harvest-persist`)
//! - Sequential drain with bounded retry and explicit eviction reporting
//! - Single-flight guard so overlapping sync triggers never race

pub mod backend;
pub mod clock;
pub mod delivery;
pub mod item;
pub mod memory;
pub mod processor;

pub use backend::{QueueError, QueueStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::{delivery_fn, Deliver, DeliveryError, DeliveryFn};
pub use item::{Metadata, NewItem, QueuedItem};
pub use memory::MemoryStore;
pub use processor::{DrainReport, ProcessorConfig, QueueProcessor, DEFAULT_MAX_RETRIES};
