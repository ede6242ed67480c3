//! # Deployment Service
//!
//! Async front door of the engine. Every store access goes through the
//! admission queue: deployments at HIGH priority, reads at LOW.

use crate::adapters::{InMemoryKVStore, LruActiveEntitiesCache, SystemClock};
use crate::application::contention::InFlightPointers;
use crate::application::engine::ConsistencyEngine;
use crate::config::EngineConfig;
use crate::domain::entities::{
    normalize_pointers, AuditInfo, ContentHash, Deployment, Entity, EntityId, EntityType,
    Pointer, Timestamp,
};
use crate::domain::errors::DeploymentError;
use crate::domain::value_objects::{DeploymentResult, PointerChanges, PointerChangesFilter};
use crate::ports::inbound::DeploymentApi;
use crate::ports::outbound::{ActiveEntitiesCache, Clock, KeyValueStore};
use async_trait::async_trait;
use catalyst_telemetry::POINTER_CONTENTION;
use cs_01_admission_queue::{AdmissionQueue, Priority, QueueError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DeploymentService {
    engine: Arc<ConsistencyEngine>,
    queue: AdmissionQueue,
    in_flight: Arc<InFlightPointers>,
}

impl DeploymentService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cache: Arc<dyn ActiveEntitiesCache>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Result<Self, DeploymentError> {
        let engine = ConsistencyEngine::new(store, cache, clock)?;
        Ok(Self {
            engine: Arc::new(engine),
            queue: AdmissionQueue::new(config.queue.clone()),
            in_flight: Arc::new(InFlightPointers::new()),
        })
    }

    /// Service over a fresh in-memory store.
    pub fn in_memory(config: &EngineConfig) -> Result<Self, DeploymentError> {
        Self::new(
            Arc::new(InMemoryKVStore::new()),
            Arc::new(LruActiveEntitiesCache::new(config.active_entities_cache_size)),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Service over the store selected by `config.storage_path`.
    pub fn open(config: &EngineConfig) -> Result<Self, DeploymentError> {
        let store = open_store(config)?;
        info!(
            persistent = config.storage_path.is_some(),
            max_concurrency = config.queue.max_concurrency,
            max_queued = config.queue.max_queued,
            "Deployment service opened"
        );
        Self::new(
            store,
            Arc::new(LruActiveEntitiesCache::new(config.active_entities_cache_size)),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(self.engine.clock())
    }

    /// Number of (type, pointer) pairs currently reserved by deployments.
    pub fn pointers_in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(feature = "rocksdb")]
fn open_store(config: &EngineConfig) -> Result<Arc<dyn KeyValueStore>, DeploymentError> {
    use crate::adapters::{RocksDbConfig, RocksDbStore};

    let store: Arc<dyn KeyValueStore> = match &config.storage_path {
        Some(path) => Arc::new(RocksDbStore::open(RocksDbConfig::new(path.clone()))?),
        None => Arc::new(InMemoryKVStore::new()),
    };
    Ok(store)
}

#[cfg(not(feature = "rocksdb"))]
fn open_store(config: &EngineConfig) -> Result<Arc<dyn KeyValueStore>, DeploymentError> {
    if let Some(path) = &config.storage_path {
        warn!(path = %path, "Built without the rocksdb feature, using in-memory storage");
    }
    Ok(Arc::new(InMemoryKVStore::new()))
}

/// Run synchronous store work on the blocking pool so commits and full
/// table scans never park a runtime worker.
async fn blocking<T, F>(work: F) -> Result<T, DeploymentError>
where
    F: FnOnce() -> Result<T, DeploymentError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DeploymentError::Queue(QueueError::TaskFailed(e.to_string())))?
}

#[async_trait]
impl DeploymentApi for DeploymentService {
    async fn deploy_entity(
        &self,
        entity: Entity,
        audit: AuditInfo,
    ) -> Result<DeploymentResult, DeploymentError> {
        let entity = entity.validated()?;

        let reservation = self
            .in_flight
            .try_reserve(entity.entity_type, &entity.pointers)
            .map_err(|pointers| {
                POINTER_CONTENTION.inc();
                warn!(
                    entity_id = %entity.id,
                    pointers = ?pointers,
                    "Rejecting deployment, pointers already being deployed"
                );
                DeploymentError::PointersBeingDeployed { pointers }
            })?;

        // The reservation travels with the task: a caller that times out
        // must not free pointers whose deployment may still commit.
        let engine = Arc::clone(&self.engine);
        self.queue
            .submit(Priority::High, async move {
                let _reservation = reservation;
                blocking(move || engine.deploy(&entity, &audit)).await
            })
            .await?
    }

    async fn get_active_entity_ids(
        &self,
        entity_type: EntityType,
        pointers: Vec<Pointer>,
    ) -> Result<BTreeMap<Pointer, EntityId>, DeploymentError> {
        let engine = Arc::clone(&self.engine);
        let pointers = normalize_pointers(pointers);
        self.queue
            .submit(Priority::Low, async move {
                engine.active_entity_ids(entity_type, &pointers)
            })
            .await?
    }

    async fn get_deployment(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<Deployment>, DeploymentError> {
        let engine = Arc::clone(&self.engine);
        self.queue
            .submit(Priority::Low, async move { engine.deployment(&entity_id) })
            .await?
    }

    async fn get_pointer_changes(
        &self,
        filter: PointerChangesFilter,
    ) -> Result<Vec<PointerChanges>, DeploymentError> {
        let engine = Arc::clone(&self.engine);
        self.queue
            .submit(Priority::Low, async move { engine.pointer_changes(&filter) })
            .await?
    }

    async fn find_content_hashes_not_being_used_anymore(
        &self,
        last_gc_time: Timestamp,
    ) -> Result<Vec<ContentHash>, DeploymentError> {
        let engine = Arc::clone(&self.engine);
        self.queue
            .submit(Priority::Low, async move {
                blocking(move || engine.content_hashes_not_being_used_anymore(last_gc_time)).await
            })
            .await?
    }
}
