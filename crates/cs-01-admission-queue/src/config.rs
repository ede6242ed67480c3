//! Configuration for the Admission Queue

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default number of tasks executing at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;

/// Default number of tasks allowed to wait before LOW tasks are refused.
pub const DEFAULT_MAX_QUEUED: usize = 300;

/// Default bound on waiting plus running time (1 minute).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Admission queue configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum tasks executing simultaneously
    pub max_concurrency: usize,
    /// Waiting tasks at which LOW priority submissions are refused
    pub max_queued: usize,
    /// Per-task bound on waiting plus running time
    pub timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_queued: DEFAULT_MAX_QUEUED,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl QueueConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CATALYST_QUEUE_MAX_CONCURRENCY` (default: 50)
    /// - `CATALYST_QUEUE_MAX_QUEUED` (default: 300)
    /// - `CATALYST_QUEUE_TIMEOUT_MS` (default: 60000)
    ///
    /// Each variable is optional; unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_concurrency: parse_or(
                &lookup,
                "CATALYST_QUEUE_MAX_CONCURRENCY",
                defaults.max_concurrency,
            )
            .max(1),
            max_queued: parse_or(&lookup, "CATALYST_QUEUE_MAX_QUEUED", defaults.max_queued),
            timeout: Duration::from_millis(parse_or(
                &lookup,
                "CATALYST_QUEUE_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )),
        }
    }
}

/// Parse `key` from `lookup`, falling back to `default` when unset or invalid.
pub fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparsable configuration value");
            default
        }),
    }
}
