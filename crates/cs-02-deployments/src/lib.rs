//! # CS-02: Deployments
//!
//! Deployment consistency engine of a peer-replicated, content-addressed
//! entity store. Independent replicas accept the same deployments in any
//! order and agree on which entity is active for every pointer, without
//! talking to each other.
//!
//! ## Ordering Rule
//!
//! `a` happened before `b` iff `a.timestamp < b.timestamp`, or the timestamps
//! are equal and `a.id < b.id`. Everything else is derived from it:
//!
//! ```text
//! Entity ──► AlreadyDeployed? ──► calculate_overwrites ──► save_deployment
//!                                                              │
//!        cache.apply_delta ◄── commit ◄── set_entities_as_overwritten
//!                                              ▲
//!                                  resolve_pointers (last-deployed table)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Single active | At most one live deployment per (type, pointer) |
//! | Append-only | `deleter_deployment` is set once, never changed or cleared |
//! | Determinism | Final active mapping is independent of arrival order |
//! | Delta soundness | Replaying deltas rebuilds the active mapping |
//! | GC safety | Content of a current deployment is never eligible for deletion |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, ordering rule, pointer resolution, invariants
//! - `ports/` - `DeploymentApi` (inbound); store, clock, cache, content (outbound)
//! - `repository/` - Transactional tables over a `KeyValueStore`
//! - `adapters/` - In-memory and RocksDB stores, LRU cache, clocks
//! - `application/` - Engine, async service, contention guard, garbage collector
//!
//! ## Usage
//!
//! ```ignore
//! use cs_02_deployments::{DeploymentApi, DeploymentService, EngineConfig, Entity, EntityType};
//!
//! let service = DeploymentService::open(&EngineConfig::from_env())?;
//! let entity = Entity::new("bafy...", EntityType::Scene, ["0,0", "0,1"], 1_700_000_000_000);
//! let result = service.deploy_entity(entity, audit).await?;
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod repository;

pub use adapters::{
    FsContentStorage, InMemoryContentStorage, InMemoryKVStore, LruActiveEntitiesCache,
    ManualClock, SystemClock,
};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use application::{ConsistencyEngine, DeploymentService, GarbageCollectionManager};
pub use config::EngineConfig;
pub use domain::entities::{
    AuditInfo, AuthLink, ContentFile, ContentHash, Deployment, DeploymentId, Entity, EntityId,
    EntityType, Pointer, Timestamp,
};
pub use domain::errors::{DeploymentError, KVStoreError};
pub use domain::ordering::happened_before;
pub use domain::pointers::resolve_pointers;
pub use domain::value_objects::{
    Claim, DeploymentDelta, DeploymentResult, ExistingClaim, Overwrites, PointerChanges,
    PointerChangesFilter, PointerResolution, PointerState,
};
pub use ports::inbound::DeploymentApi;
pub use ports::outbound::{ActiveEntitiesCache, Clock, ContentStorage, KeyValueStore};
