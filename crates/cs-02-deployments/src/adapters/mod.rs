//! # Adapters Module
//!
//! - `storage`: `KeyValueStore` backends (in-memory, RocksDB behind the `rocksdb` feature)
//! - `cache`: LRU active-entities cache
//! - `clock`: system and manually driven clocks
//! - `content`: content blob stores (in-memory, one file per hash)

pub mod cache;
pub mod clock;
pub mod content;
pub mod storage;

pub use cache::LruActiveEntitiesCache;
pub use clock::{ManualClock, SystemClock};
pub use content::{FsContentStorage, InMemoryContentStorage};
pub use storage::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
