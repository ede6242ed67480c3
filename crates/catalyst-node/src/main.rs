//! # Catalyst Node
//!
//! Starts the deployment service over the configured store, runs the garbage
//! collector in the background and stops both on Ctrl+C.
//!
//! ## Startup Sequence
//!
//! 1. Load telemetry and engine configuration from the environment
//! 2. Install logging and register metrics
//! 3. Open the store (RocksDB when `CATALYST_STORAGE_PATH` is set)
//! 4. Spawn the garbage collector unless `CATALYST_GC_ENABLED=false`
//! 5. Wait for Ctrl+C, then signal shutdown

use std::sync::Arc;

use anyhow::{Context, Result};
use catalyst_telemetry::{init_telemetry, TelemetryConfig};
use cs_02_deployments::{
    ContentStorage, DeploymentService, EngineConfig, FsContentStorage, GarbageCollectionManager,
    InMemoryContentStorage,
};
use tracing::{info, warn};

fn content_storage(config: &EngineConfig) -> Arc<dyn ContentStorage> {
    match &config.content_path {
        Some(path) => Arc::new(FsContentStorage::new(path)),
        None => {
            warn!("CATALYST_CONTENT_PATH unset, content blobs are kept in memory");
            Arc::new(InMemoryContentStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("failed to initialise telemetry")?;

    let config = EngineConfig::from_env();
    info!(
        service = %telemetry.service_name,
        storage = config.storage_path.as_deref().unwrap_or("memory"),
        content = config.content_path.as_deref().unwrap_or("memory"),
        "Starting catalyst node"
    );

    let service = Arc::new(DeploymentService::open(&config).context("failed to open store")?);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let collector = GarbageCollectionManager::from_config(
        service.clone(),
        content_storage(&config),
        service.clock(),
        &config,
    )
    .map(|gc| {
        info!(interval_secs = config.gc_interval.as_secs(), "Garbage collector started");
        Arc::new(gc).start(shutdown_rx)
    });

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = collector {
        handle.await.context("garbage collector panicked")?;
    }
    Ok(())
}
