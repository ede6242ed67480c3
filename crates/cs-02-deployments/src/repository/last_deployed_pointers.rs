//! The last-deployed-pointer table: (type, pointer) to the most recent claim,
//! active or not.

use super::deployments::DeploymentsRepository;
use super::keys;
use super::transaction::StoreTransaction;
use super::{decode, encode};
use crate::domain::entities::{DeploymentId, EntityType, Pointer};
use crate::domain::errors::DeploymentError;
use crate::domain::value_objects::{Claim, ExistingClaim};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
pub struct LastDeployedPointersRepository;

impl LastDeployedPointersRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn get_last_deployment_id(
        &self,
        tx: &StoreTransaction<'_>,
        entity_type: EntityType,
        pointer: &str,
    ) -> Result<Option<DeploymentId>, DeploymentError> {
        tx.get(&keys::last_deployed(entity_type, pointer))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Current claim on each pointer, resolved through deployment history.
    pub fn get_last_claims(
        &self,
        tx: &StoreTransaction<'_>,
        deployments: &DeploymentsRepository,
        entity_type: EntityType,
        pointers: &[Pointer],
    ) -> Result<BTreeMap<Pointer, Claim>, DeploymentError> {
        let mut claims = BTreeMap::new();
        let mut resolved: BTreeMap<DeploymentId, ExistingClaim> = BTreeMap::new();

        for pointer in pointers {
            let claim = match self.get_last_deployment_id(tx, entity_type, pointer)? {
                Some(id) => {
                    let existing = match resolved.get(&id) {
                        Some(existing) => existing.clone(),
                        None => {
                            let deployment = deployments.get_referenced_deployment(tx, id)?;
                            let existing = ExistingClaim::from_deployment(&deployment);
                            resolved.insert(id, existing.clone());
                            existing
                        }
                    };
                    Claim::Existing(existing)
                }
                None => Claim::Unclaimed,
            };
            claims.insert(pointer.clone(), claim);
        }
        Ok(claims)
    }

    pub fn set_last_deployment(
        &self,
        tx: &mut StoreTransaction<'_>,
        entity_type: EntityType,
        pointers: &BTreeSet<Pointer>,
        deployment_id: DeploymentId,
    ) -> Result<(), DeploymentError> {
        let value = encode(&deployment_id)?;
        for pointer in pointers {
            tx.put(keys::last_deployed(entity_type, pointer), value.clone());
        }
        Ok(())
    }
}
