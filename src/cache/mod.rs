// Cache store module
// Author: kelexine (https://github.com/kelexine)

pub mod models;
pub mod persistence;
pub mod store;

pub use models::{CacheStats, Generation, GenerationStats};
pub use persistence::{Snapshot, SnapshotStore};
pub use store::CacheStore;
