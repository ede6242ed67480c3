//! Pointer resolution.
//!
//! Given a newly accepted entity and the last claim on each of its pointers,
//! compute the before/after transition of every affected pointer and the
//! pointers whose last-deployed row must now reference the new deployment.
//!
//! Activation is all-or-nothing: if any pointer of the entity is already
//! claimed by something that happened after it, the entity is inactive on
//! every one of its pointers.

use crate::domain::entities::{DeploymentId, Entity, Pointer};
use crate::domain::value_objects::{
    Claim, DeploymentDelta, ExistingClaim, PointerResolution, PointerState,
};
use std::collections::{BTreeMap, BTreeSet};

/// Resolve the pointer transitions caused by `entity`.
///
/// `last_claims` is keyed by pointer. Pointers of the entity missing from the
/// map are treated as [`Claim::Unclaimed`]. Each entity pointer is resolved
/// against its own row only, so two claims that disagree about a shared
/// pointer can never produce contradictory deltas.
pub fn resolve_pointers(entity: &Entity, last_claims: &BTreeMap<Pointer, Claim>) -> PointerResolution {
    let claim_for = |pointer: &Pointer| last_claims.get(pointer).unwrap_or(&Claim::Unclaimed);

    let will_become_active = entity
        .pointers
        .iter()
        .all(|pointer| claim_for(pointer).happened_before(entity));
    let after = if will_become_active {
        PointerState::Set
    } else {
        PointerState::Cleared
    };

    let mut resolution = PointerResolution {
        will_become_active,
        ..Default::default()
    };
    // Older live claims, visited once each for their remaining pointers
    let mut superseded: BTreeMap<DeploymentId, &ExistingClaim> = BTreeMap::new();

    for pointer in &entity.pointers {
        let claim = claim_for(pointer);
        if !claim.happened_before(entity) {
            // The entity loses here and must not disturb existing state
            continue;
        }

        resolution.pointers_to_overwrite.insert(pointer.clone());

        let before = claim.active_deployment();
        if before.is_some() || will_become_active {
            resolution
                .deltas
                .insert(pointer.clone(), DeploymentDelta::new(before, after));
        }

        if let Claim::Existing(existing) = claim {
            if !existing.deleted {
                superseded.insert(existing.deployment_id, existing);
            }
        }
    }

    let entity_pointers: BTreeSet<&Pointer> = entity.pointers.iter().collect();
    for existing in superseded.values() {
        for pointer in existing.pointers.iter().filter(|p| !entity_pointers.contains(p)) {
            resolution.deltas.insert(
                pointer.clone(),
                DeploymentDelta::new(Some(existing.deployment_id), PointerState::Cleared),
            );
        }
    }

    resolution
}
