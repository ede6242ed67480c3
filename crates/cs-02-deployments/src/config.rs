//! Configuration for the deployment engine

use cs_01_admission_queue::config::parse_or;
use cs_01_admission_queue::QueueConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default time between garbage collection sweeps (6 hours).
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Shortest accepted time between sweeps.
pub const MIN_GC_INTERVAL: Duration = Duration::from_secs(1);

/// Default capacity of the active-entities cache.
pub const DEFAULT_ACTIVE_ENTITIES_CACHE_SIZE: usize = 150_000;

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub queue: QueueConfig,
    pub gc_enabled: bool,
    pub gc_interval: Duration,
    pub active_entities_cache_size: usize,
    /// RocksDB directory; in-memory storage when unset
    pub storage_path: Option<String>,
    /// Directory of content blobs swept by the garbage collector
    pub content_path: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            gc_enabled: true,
            gc_interval: DEFAULT_GC_INTERVAL,
            active_entities_cache_size: DEFAULT_ACTIVE_ENTITIES_CACHE_SIZE,
            storage_path: None,
            content_path: None,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - queue variables, see [`QueueConfig::from_env`]
    /// - `CATALYST_GC_ENABLED` (default: true)
    /// - `CATALYST_GC_INTERVAL_SECS` (default: 21600, at least 1)
    /// - `CATALYST_ACTIVE_ENTITIES_CACHE_SIZE` (default: 150000)
    /// - `CATALYST_STORAGE_PATH` (default: unset, in-memory)
    /// - `CATALYST_CONTENT_PATH` (default: unset, in-memory)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            queue: QueueConfig::from_lookup(&lookup),
            gc_enabled: parse_or(&lookup, "CATALYST_GC_ENABLED", defaults.gc_enabled),
            gc_interval: Duration::from_secs(parse_or(
                &lookup,
                "CATALYST_GC_INTERVAL_SECS",
                defaults.gc_interval.as_secs(),
            ))
            .max(MIN_GC_INTERVAL),
            active_entities_cache_size: parse_or(
                &lookup,
                "CATALYST_ACTIVE_ENTITIES_CACHE_SIZE",
                defaults.active_entities_cache_size,
            ),
            storage_path: lookup("CATALYST_STORAGE_PATH").filter(|p| !p.trim().is_empty()),
            content_path: lookup("CATALYST_CONTENT_PATH").filter(|p| !p.trim().is_empty()),
        }
    }
}
