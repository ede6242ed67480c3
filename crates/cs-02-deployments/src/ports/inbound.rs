//! # Inbound Ports (Driving Ports)
//!
//! The API the deployment pipeline and read paths call.

use crate::domain::entities::{AuditInfo, ContentHash, Deployment, Entity, EntityId, EntityType, Pointer, Timestamp};
use crate::domain::errors::DeploymentError;
use crate::domain::value_objects::{DeploymentResult, PointerChanges, PointerChangesFilter};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Primary API of the deployment consistency engine.
///
/// Writes run at HIGH admission priority, reads at LOW.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Accept an already validated entity.
    ///
    /// ## Errors
    ///
    /// - `PointersBeingDeployed`: an overlapping deployment is in flight (retryable)
    /// - `AlreadyDeployed`: this entity id was accepted before (terminal)
    /// - `Queue(Timeout)`: the caller stopped waiting; the write may still commit
    /// - `Storage`: propagated unchanged, nothing was written
    async fn deploy_entity(
        &self,
        entity: Entity,
        audit: AuditInfo,
    ) -> Result<DeploymentResult, DeploymentError>;

    /// Active entity id for each of `pointers` that has one.
    ///
    /// ## Errors
    ///
    /// - `Queue(Saturated)`: read traffic is being shed (retryable)
    async fn get_active_entity_ids(
        &self,
        entity_type: EntityType,
        pointers: Vec<Pointer>,
    ) -> Result<BTreeMap<Pointer, EntityId>, DeploymentError>;

    /// Local deployment record of an entity.
    async fn get_deployment(&self, entity_id: EntityId) -> Result<Option<Deployment>, DeploymentError>;

    /// Persisted deltas, ordered by local timestamp.
    async fn get_pointer_changes(
        &self,
        filter: PointerChangesFilter,
    ) -> Result<Vec<PointerChanges>, DeploymentError>;

    /// Content hashes whose every relevant deployment has been superseded.
    async fn find_content_hashes_not_being_used_anymore(
        &self,
        last_gc_time: Timestamp,
    ) -> Result<Vec<ContentHash>, DeploymentError>;
}
