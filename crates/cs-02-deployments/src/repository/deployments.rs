//! Deployment history: the `dep` table, the entity id index and the pointer
//! index used for overlap detection.

use super::keys;
use super::transaction::StoreTransaction;
use super::{decode, encode};
use crate::domain::entities::{AuditInfo, Deployment, DeploymentId, Entity, EntityType, Timestamp};
use crate::domain::errors::{DeploymentError, KVStoreError};
use crate::domain::ordering::{compare, happened_before};
use crate::domain::value_objects::Overwrites;
use crate::ports::outbound::KeyValueStore;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub struct DeploymentsRepository {
    next_id: AtomicU64,
}

impl DeploymentsRepository {
    /// Seed the id counter from the highest stored deployment.
    pub fn open(store: &dyn KeyValueStore) -> Result<Self, DeploymentError> {
        let last = store
            .prefix_scan(keys::DEPLOYMENT_PREFIX)?
            .last()
            .and_then(|(key, _)| keys::trailing_id(key))
            .unwrap_or(0);
        Ok(Self {
            next_id: AtomicU64::new(last + 1),
        })
    }

    /// Ids start at 1 and are never reused, even when a transaction rolls back.
    pub fn allocate_id(&self) -> DeploymentId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn get_deployment(
        &self,
        tx: &StoreTransaction<'_>,
        id: DeploymentId,
    ) -> Result<Option<Deployment>, DeploymentError> {
        tx.get(&keys::deployment(id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Like `get_deployment`, for ids that some other row points at.
    pub fn get_referenced_deployment(
        &self,
        tx: &StoreTransaction<'_>,
        id: DeploymentId,
    ) -> Result<Deployment, DeploymentError> {
        self.get_deployment(tx, id)?.ok_or_else(|| {
            KVStoreError::CorruptionError {
                message: format!("deployment {} is referenced but missing", id),
            }
            .into()
        })
    }

    pub fn get_deployment_by_entity(
        &self,
        tx: &StoreTransaction<'_>,
        entity_id: &str,
    ) -> Result<Option<Deployment>, DeploymentError> {
        match tx.get(&keys::entity(entity_id))? {
            Some(bytes) => {
                let id: DeploymentId = decode(&bytes)?;
                self.get_referenced_deployment(tx, id).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn is_entity_deployed(
        &self,
        tx: &StoreTransaction<'_>,
        entity_id: &str,
    ) -> Result<bool, DeploymentError> {
        Ok(tx.exists(&keys::entity(entity_id))?)
    }

    /// Insert the deployment row with its entity id and pointer index rows.
    ///
    /// `overwritten_by` is only non-empty for late arrivals; such a deployment
    /// is born superseded and never touches the rows of its successor.
    ///
    /// A late arrival therefore gets its `deleter_deployment` from its own
    /// deployment call instead of keeping it unset. Nothing ever activates it,
    /// and an unset deleter would report it as current, which would keep its
    /// content alive through garbage collection forever.
    pub fn save_deployment(
        &self,
        tx: &mut StoreTransaction<'_>,
        entity: &Entity,
        audit: &AuditInfo,
        local_timestamp: Timestamp,
        overwritten_by: Option<DeploymentId>,
    ) -> Result<Deployment, DeploymentError> {
        let metadata = entity
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DeploymentError::Serialization(e.to_string()))?;

        let deployment = Deployment {
            id: self.allocate_id(),
            entity_id: entity.id.clone(),
            entity_type: entity.entity_type,
            entity_pointers: entity.pointers.clone(),
            entity_timestamp: entity.timestamp,
            deployer_address: audit.deployer_address.clone(),
            origin_timestamp: audit.origin_timestamp,
            local_timestamp,
            auth_chain: audit.auth_chain.clone(),
            metadata,
            deleter_deployment: overwritten_by,
        };

        tx.put(keys::deployment(deployment.id), encode(&deployment)?);
        tx.put(keys::entity(&deployment.entity_id), encode(&deployment.id)?);
        for pointer in &deployment.entity_pointers {
            tx.put(
                keys::pointer_index(deployment.entity_type, pointer, deployment.id),
                Vec::new(),
            );
        }

        debug!(
            deployment_id = deployment.id,
            entity_id = %deployment.entity_id,
            "Deployment row inserted"
        );
        Ok(deployment)
    }

    /// Deployments of `entity`'s type sharing at least one pointer with it,
    /// found through the pointer index. The entity's own row is excluded.
    pub fn find_overlapping(
        &self,
        tx: &StoreTransaction<'_>,
        entity: &Entity,
    ) -> Result<Vec<Deployment>, DeploymentError> {
        let mut ids = BTreeSet::new();
        for pointer in &entity.pointers {
            let prefix = keys::pointer_index_prefix(entity.entity_type, pointer);
            for (key, _) in tx.prefix_scan(&prefix)? {
                let id = keys::trailing_id(&key).ok_or_else(|| KVStoreError::CorruptionError {
                    message: format!("malformed pointer index key for {}", pointer),
                })?;
                ids.insert(id);
            }
        }

        let mut overlapping = Vec::with_capacity(ids.len());
        for id in ids {
            let deployment = self.get_referenced_deployment(tx, id)?;
            if deployment.entity_id != entity.id
                && deployment.shares_pointer_with(&entity.pointers)
            {
                overlapping.push(deployment);
            }
        }
        Ok(overlapping)
    }

    /// Unindexed scan over every deployment of one type. Only used as the
    /// scene fallback in [`calculate_overwrites`](Self::calculate_overwrites).
    fn scan_deployments_of_type(
        &self,
        tx: &StoreTransaction<'_>,
        entity_type: EntityType,
    ) -> Result<Vec<Deployment>, DeploymentError> {
        let mut deployments = Vec::new();
        for (_, bytes) in tx.prefix_scan(keys::DEPLOYMENT_PREFIX)? {
            let deployment: Deployment = decode(&bytes)?;
            if deployment.entity_type == entity_type {
                deployments.push(deployment);
            }
        }
        Ok(deployments)
    }

    /// Which deployments `entity` supersedes, and which one supersedes it.
    ///
    /// `overwrote`: overlapping deployments that happened before the entity
    /// and are not already superseded by something that happened before it.
    /// `overwritten_by`: the earliest overlapping deployment that happened
    /// after the entity (its immediate successor).
    pub fn calculate_overwrites(
        &self,
        tx: &StoreTransaction<'_>,
        entity: &Entity,
    ) -> Result<Overwrites, DeploymentError> {
        let overlapping = self.find_overlapping(tx, entity)?;

        let mut overwrote = BTreeSet::new();
        for prior in overlapping.iter().filter(|d| happened_before(*d, entity)) {
            let still_current = match prior.deleter_deployment {
                None => true,
                Some(deleter_id) => {
                    let deleter = self.get_referenced_deployment(tx, deleter_id)?;
                    happened_before(entity, &deleter)
                }
            };
            if still_current {
                overwrote.insert(prior.id);
            }
        }

        let mut overwritten_by = earliest_successor(entity, &overlapping);

        if overwritten_by.is_none() && entity.entity_type == EntityType::Scene {
            overwritten_by = self.scene_successor_fallback(tx, entity)?;
        }

        Ok(Overwrites {
            overwrote,
            overwritten_by,
        })
    }

    /// Secondary path for scenes: look for a successor with a full scan when
    /// the pointer index found none. Overlap is recomputed from the stored
    /// pointer arrays rather than trusted to the index.
    fn scene_successor_fallback(
        &self,
        tx: &StoreTransaction<'_>,
        entity: &Entity,
    ) -> Result<Option<DeploymentId>, DeploymentError> {
        let candidates: Vec<Deployment> = self
            .scan_deployments_of_type(tx, EntityType::Scene)?
            .into_iter()
            .filter(|d| d.entity_id != entity.id && d.shares_pointer_with(&entity.pointers))
            .collect();

        let successor = earliest_successor(entity, &candidates);
        if let Some(id) = successor {
            warn!(
                entity_id = %entity.id,
                successor = id,
                "Scene successor found only by full scan"
            );
        }
        Ok(successor)
    }

    /// Set `deleter_deployment` on every listed deployment that has none yet.
    /// Rows that already carry a deleter are left untouched.
    ///
    /// Returns the ids actually updated.
    pub fn set_entities_as_overwritten(
        &self,
        tx: &mut StoreTransaction<'_>,
        overwritten: &BTreeSet<DeploymentId>,
        deleter: DeploymentId,
    ) -> Result<Vec<DeploymentId>, DeploymentError> {
        let mut updated = Vec::with_capacity(overwritten.len());
        for id in overwritten {
            let mut deployment = self.get_referenced_deployment(tx, *id)?;
            if let Some(existing) = deployment.deleter_deployment {
                debug!(
                    deployment_id = id,
                    existing_deleter = existing,
                    deleter,
                    "Deleter already set, keeping it"
                );
                continue;
            }
            deployment.deleter_deployment = Some(deleter);
            tx.put(keys::deployment(*id), encode(&deployment)?);
            updated.push(*id);
        }
        Ok(updated)
    }
}

fn earliest_successor(entity: &Entity, candidates: &[Deployment]) -> Option<DeploymentId> {
    candidates
        .iter()
        .filter(|d| happened_before(entity, *d))
        .min_by(|a, b| compare(*a, *b))
        .map(|d| d.id)
}
