//! Shared builders for the integration suites and benchmarks.

use cs_01_admission_queue::QueueConfig;
use cs_02_deployments::{
    AuditInfo, ConsistencyEngine, DeploymentService, EngineConfig, Entity, EntityType,
    InMemoryKVStore, LruActiveEntitiesCache, ManualClock, Pointer, Timestamp,
};
use std::sync::Arc;

/// Local clock start for every fixture.
pub const CLOCK_START: Timestamp = 1_700_000_000_000;

pub fn scene(id: &str, pointers: &[&str], timestamp: Timestamp) -> Entity {
    Entity::new(id, EntityType::Scene, pointers.iter().copied(), timestamp)
}

pub fn profile(address: &str, timestamp: Timestamp) -> Entity {
    Entity::new(
        format!("{}-{}", address, timestamp),
        EntityType::Profile,
        [address],
        timestamp,
    )
}

pub fn audit() -> AuditInfo {
    AuditInfo::new("0xdeployer", CLOCK_START)
}

pub fn pointers(ps: &[&str]) -> Vec<Pointer> {
    ps.iter().map(|p| p.to_string()).collect()
}

/// Synchronous engine over a fresh in-memory store.
pub fn engine() -> (ConsistencyEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(CLOCK_START));
    let engine = ConsistencyEngine::new(
        Arc::new(InMemoryKVStore::new()),
        Arc::new(LruActiveEntitiesCache::new(1_000)),
        clock.clone(),
    )
    .expect("fresh store");
    (engine, clock)
}

/// Async service over a fresh in-memory store.
pub fn service(queue: QueueConfig) -> (Arc<DeploymentService>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(CLOCK_START));
    let config = EngineConfig {
        queue,
        ..Default::default()
    };
    let service = DeploymentService::new(
        Arc::new(InMemoryKVStore::new()),
        Arc::new(LruActiveEntitiesCache::new(1_000)),
        clock.clone(),
        &config,
    )
    .expect("fresh store");
    (Arc::new(service), clock)
}
