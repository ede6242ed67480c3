//! Value objects for Deployments

use crate::domain::entities::{
    Deployment, DeploymentId, Entity, EntityId, EntityType, Pointer, Timestamp,
};
use crate::domain::ordering::{happened_before, Chronological};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A row of the last-deployed-pointer table, resolved to its deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistingClaim {
    pub deployment_id: DeploymentId,
    pub entity_id: EntityId,
    pub timestamp: Timestamp,
    /// Every pointer the claiming deployment holds
    pub pointers: BTreeSet<Pointer>,
    /// The claiming deployment has already been overwritten
    pub deleted: bool,
}

impl ExistingClaim {
    pub fn from_deployment(deployment: &Deployment) -> Self {
        Self {
            deployment_id: deployment.id,
            entity_id: deployment.entity_id.clone(),
            timestamp: deployment.entity_timestamp,
            pointers: deployment.entity_pointers.iter().cloned().collect(),
            deleted: deployment.is_overwritten(),
        }
    }
}

impl Chronological for ExistingClaim {
    fn entity_timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

/// Most recent claim on one pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Claim {
    Existing(ExistingClaim),
    /// Nobody has ever claimed the pointer
    Unclaimed,
}

impl Claim {
    /// An unclaimed pointer precedes every entity.
    pub fn happened_before(&self, entity: &Entity) -> bool {
        match self {
            Claim::Existing(claim) => happened_before(claim, entity),
            Claim::Unclaimed => true,
        }
    }

    /// The deployment currently active through this claim, if any.
    pub fn active_deployment(&self) -> Option<DeploymentId> {
        match self {
            Claim::Existing(claim) if !claim.deleted => Some(claim.deployment_id),
            _ => None,
        }
    }
}

/// State of a pointer after a deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerState {
    /// The deploying entity is now active on the pointer
    Set,
    /// Nothing is active on the pointer any more
    Cleared,
}

/// Before/after transition of one pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDelta {
    pub before: Option<DeploymentId>,
    pub after: PointerState,
}

impl DeploymentDelta {
    pub fn new(before: Option<DeploymentId>, after: PointerState) -> Self {
        Self { before, after }
    }
}

/// Output of pointer resolution for one entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointerResolution {
    pub deltas: BTreeMap<Pointer, DeploymentDelta>,
    /// Pointers whose last-deployed row must now reference the new deployment
    pub pointers_to_overwrite: BTreeSet<Pointer>,
    pub will_become_active: bool,
}

/// Output of the overwrite-chain resolver for one entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overwrites {
    /// Previously current deployments the entity supersedes
    pub overwrote: BTreeSet<DeploymentId>,
    /// Immediate successor of the entity, if one is already known
    pub overwritten_by: Option<DeploymentId>,
}

/// Everything a caller learns from a committed deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentResult {
    pub deployment_id: DeploymentId,
    pub entity_id: EntityId,
    pub local_timestamp: Timestamp,
    pub deltas: BTreeMap<Pointer, DeploymentDelta>,
    pub overwrote: BTreeSet<DeploymentId>,
    pub overwritten_by: Option<DeploymentId>,
}

impl DeploymentResult {
    pub fn is_active(&self) -> bool {
        self.overwritten_by.is_none()
    }
}

/// Persisted delta of one deployment, as served by the pointer-changes feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerChanges {
    pub deployment_id: DeploymentId,
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub local_timestamp: Timestamp,
    pub changes: BTreeMap<Pointer, DeploymentDelta>,
}

/// Query over the pointer-changes feed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointerChangesFilter {
    /// Only changes recorded at or after this local timestamp
    pub from_local_timestamp: Option<Timestamp>,
    /// Only changes recorded at or before this local timestamp
    pub to_local_timestamp: Option<Timestamp>,
    /// Restrict to these entity types (empty means all)
    pub entity_types: Vec<EntityType>,
    pub limit: Option<usize>,
}

impl PointerChangesFilter {
    pub fn matches(&self, changes: &PointerChanges) -> bool {
        self.from_local_timestamp
            .map_or(true, |from| changes.local_timestamp >= from)
            && self
                .to_local_timestamp
                .map_or(true, |to| changes.local_timestamp <= to)
            && (self.entity_types.is_empty() || self.entity_types.contains(&changes.entity_type))
    }
}
