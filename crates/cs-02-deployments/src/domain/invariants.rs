//! Domain invariants for Deployments
//!
//! Checkers used by the engine's tests and the cross-crate convergence suite.

use super::entities::{Deployment, DeploymentId, Entity, EntityId, EntityType, Pointer};
use super::ordering::happened_before;
use super::value_objects::{DeploymentDelta, PointerState};
use std::collections::{BTreeMap, HashMap};

/// Active deployment per (type, pointer), rebuilt from deltas.
pub type ActiveMapping = BTreeMap<(EntityType, Pointer), DeploymentId>;

/// `deleter_deployment` may go from unset to set, never anywhere else.
pub fn invariant_append_only(before: Option<DeploymentId>, after: Option<DeploymentId>) -> bool {
    match (before, after) {
        (None, _) => true,
        (Some(b), Some(a)) => a == b,
        (Some(_), None) => false,
    }
}

/// At most one live deployment per (type, pointer).
pub fn invariant_single_active(deployments: &[Deployment]) -> bool {
    let mut live: HashMap<(EntityType, &Pointer), DeploymentId> = HashMap::new();
    for deployment in deployments.iter().filter(|d| !d.is_overwritten()) {
        for pointer in &deployment.entity_pointers {
            if live
                .insert((deployment.entity_type, pointer), deployment.id)
                .is_some()
            {
                return false;
            }
        }
    }
    true
}

/// Every `before` of a delta matches the mapping it is applied to.
pub fn invariant_delta_sound(
    active: &ActiveMapping,
    entity_type: EntityType,
    deltas: &BTreeMap<Pointer, DeploymentDelta>,
) -> bool {
    deltas.iter().all(|(pointer, delta)| {
        active.get(&(entity_type, pointer.clone())).copied() == delta.before
    })
}

/// Fold one deployment's deltas into `active`.
pub fn apply_deltas(
    active: &mut ActiveMapping,
    entity_type: EntityType,
    deployment_id: DeploymentId,
    deltas: &BTreeMap<Pointer, DeploymentDelta>,
) {
    for (pointer, delta) in deltas {
        let key = (entity_type, pointer.clone());
        match delta.after {
            PointerState::Set => {
                active.insert(key, deployment_id);
            }
            PointerState::Cleared => {
                active.remove(&key);
            }
        }
    }
}

/// Active entity per (type, pointer) computed from scratch.
///
/// An entity is active iff no other entity of its type sharing a pointer
/// happened after it. Independent of the order `entities` is given in.
pub fn expected_active_entities(entities: &[Entity]) -> BTreeMap<(EntityType, Pointer), EntityId> {
    let is_active = |entity: &Entity| {
        !entities.iter().any(|other| {
            other.entity_type == entity.entity_type
                && other.id != entity.id
                && other.pointers.iter().any(|p| entity.pointers.contains(p))
                && happened_before(entity, other)
        })
    };

    entities
        .iter()
        .filter(|entity| is_active(entity))
        .flat_map(|entity| {
            entity
                .pointers
                .iter()
                .map(move |p| ((entity.entity_type, p.clone()), entity.id.clone()))
        })
        .collect()
}
