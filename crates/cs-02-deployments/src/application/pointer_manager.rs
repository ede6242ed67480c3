//! Pointer manager: feeds the last-deployed-pointer table into
//! [`resolve_pointers`] and writes the outcome back in the same transaction.

use crate::domain::entities::{DeploymentId, Entity, EntityId, EntityType, Pointer};
use crate::domain::errors::DeploymentError;
use crate::domain::pointers::resolve_pointers;
use crate::domain::value_objects::{Claim, PointerResolution};
use crate::repository::{DeploymentsRepository, LastDeployedPointersRepository, StoreTransaction};
use tracing::debug;

#[derive(Default)]
pub struct PointerManager {
    last_deployed: LastDeployedPointersRepository,
}

impl PointerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `entity` against the current claims and point the last-deployed
    /// rows it wins at `deployment_id`.
    ///
    /// Must run before any deployment is marked overwritten in `tx`: the
    /// claims' `deleted` flags have to reflect the state prior to this entity.
    pub fn reference_entity_from_pointers(
        &self,
        tx: &mut StoreTransaction<'_>,
        deployments: &DeploymentsRepository,
        entity: &Entity,
        deployment_id: DeploymentId,
    ) -> Result<PointerResolution, DeploymentError> {
        let claims =
            self.last_deployed
                .get_last_claims(tx, deployments, entity.entity_type, &entity.pointers)?;
        let resolution = resolve_pointers(entity, &claims);

        self.last_deployed.set_last_deployment(
            tx,
            entity.entity_type,
            &resolution.pointers_to_overwrite,
            deployment_id,
        )?;

        debug!(
            entity_id = %entity.id,
            deployment_id,
            active = resolution.will_become_active,
            changed = resolution.deltas.len(),
            "Pointers resolved"
        );
        Ok(resolution)
    }

    /// Entity active on `pointer`, if any.
    pub fn active_entity(
        &self,
        tx: &StoreTransaction<'_>,
        deployments: &DeploymentsRepository,
        entity_type: EntityType,
        pointer: &Pointer,
    ) -> Result<Option<EntityId>, DeploymentError> {
        let claims = self.last_deployed.get_last_claims(
            tx,
            deployments,
            entity_type,
            std::slice::from_ref(pointer),
        )?;
        Ok(match claims.get(pointer) {
            Some(Claim::Existing(claim)) if !claim.deleted => Some(claim.entity_id.clone()),
            _ => None,
        })
    }
}
