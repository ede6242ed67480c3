//! # Garbage Collection
//!
//! Periodically deletes content blobs that only superseded deployments
//! reference. The watermark is the start time of the last successful sweep;
//! each sweep only looks at deployments superseded after it.

use crate::config::{EngineConfig, MIN_GC_INTERVAL};
use crate::domain::entities::{ContentHash, Timestamp};
use crate::domain::errors::DeploymentError;
use crate::ports::inbound::DeploymentApi;
use crate::ports::outbound::{Clock, ContentStorage};
use catalyst_telemetry::GC_DELETED_HASHES;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct GarbageCollectionManager {
    api: Arc<dyn DeploymentApi>,
    content: Arc<dyn ContentStorage>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    last_sweep: AtomicU64,
}

impl GarbageCollectionManager {
    pub fn new(
        api: Arc<dyn DeploymentApi>,
        content: Arc<dyn ContentStorage>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        if interval < MIN_GC_INTERVAL {
            warn!(
                interval_ms = interval.as_millis() as u64,
                "Garbage collection interval too short, using the minimum"
            );
        }
        Self {
            api,
            content,
            clock,
            interval: interval.max(MIN_GC_INTERVAL),
            last_sweep: AtomicU64::new(0),
        }
    }

    /// Collector sweeping every `config.gc_interval`, or `None` when disabled.
    pub fn from_config(
        api: Arc<dyn DeploymentApi>,
        content: Arc<dyn ContentStorage>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Option<Self> {
        if !config.gc_enabled {
            info!("Garbage collection disabled");
            return None;
        }
        Some(Self::new(api, content, clock, config.gc_interval))
    }

    pub fn watermark(&self) -> Timestamp {
        self.last_sweep.load(Ordering::SeqCst)
    }

    /// One sweep. The watermark only advances if the blobs were deleted.
    pub async fn perform_sweep(&self) -> Result<Vec<ContentHash>, DeploymentError> {
        let sweep_started = self.clock.now_millis();
        let watermark = self.watermark();

        let hashes = self
            .api
            .find_content_hashes_not_being_used_anymore(watermark)
            .await?;
        if !hashes.is_empty() {
            self.content.delete(&hashes).await?;
            GC_DELETED_HASHES.inc_by(hashes.len() as f64);
        }

        self.last_sweep.store(sweep_started, Ordering::SeqCst);
        info!(
            deleted = hashes.len(),
            watermark,
            next_watermark = sweep_started,
            "Garbage collection sweep finished"
        );
        Ok(hashes)
    }

    /// Sweep every `interval` until `shutdown` changes.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.perform_sweep().await {
                            error!(
                                error = %e,
                                retryable = e.is_retryable(),
                                "Garbage collection sweep failed"
                            );
                        }
                    }
                    _ = shutdown.changed() => {
                        debug!("Garbage collector shutting down");
                        break;
                    }
                }
            }
        })
    }
}
