//! # Consistency Engine
//!
//! Runs one deployment as a single store transaction:
//!
//! 1. Reject entity ids this replica already accepted
//! 2. Compute overwrites from deployment history
//! 3. Insert the deployment (born superseded if a successor is already known)
//! 4. Resolve pointers against the last-deployed table and update it
//! 5. Mark overwritten deployments
//! 6. Record content files and the pointer delta
//! 7. Commit, then apply the delta to the active-entities cache
//!
//! Methods are synchronous; the service runs them inside admission queue slots.

use crate::application::pointer_manager::PointerManager;
use crate::domain::entities::{
    AuditInfo, ContentHash, Deployment, Entity, EntityId, EntityType, Pointer, Timestamp,
};
use crate::domain::errors::DeploymentError;
use crate::domain::value_objects::{DeploymentResult, PointerChanges, PointerChangesFilter};
use crate::ports::outbound::{ActiveEntitiesCache, Clock, KeyValueStore};
use crate::repository::{
    ContentFilesRepository, DeploymentsRepository, PointerChangesRepository, StoreTransaction,
};
use catalyst_telemetry::{DEPLOYMENTS_COMMITTED, DEPLOYMENT_DURATION};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ConsistencyEngine {
    store: Arc<dyn KeyValueStore>,
    deployments: DeploymentsRepository,
    pointer_manager: PointerManager,
    content_files: ContentFilesRepository,
    pointer_changes: PointerChangesRepository,
    cache: Arc<dyn ActiveEntitiesCache>,
    clock: Arc<dyn Clock>,
    /// Serializes deployment transactions. Two deployments on disjoint
    /// pointers can still supersede the same older deployment.
    commit_lock: Mutex<()>,
}

impl ConsistencyEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cache: Arc<dyn ActiveEntitiesCache>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DeploymentError> {
        let deployments = DeploymentsRepository::open(store.as_ref())?;
        Ok(Self {
            store,
            deployments,
            pointer_manager: PointerManager::new(),
            content_files: ContentFilesRepository::new(),
            pointer_changes: PointerChangesRepository::new(),
            cache,
            clock,
            commit_lock: Mutex::new(()),
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Accept an entity. Nothing is written unless every step succeeds.
    pub fn deploy(
        &self,
        entity: &Entity,
        audit: &AuditInfo,
    ) -> Result<DeploymentResult, DeploymentError> {
        let _timer = DEPLOYMENT_DURATION.start_timer();
        let _commit = self.commit_lock.lock();
        let mut tx = StoreTransaction::begin(self.store.as_ref());

        if self.deployments.is_entity_deployed(&tx, &entity.id)? {
            return Err(DeploymentError::AlreadyDeployed {
                entity_id: entity.id.clone(),
            });
        }

        let local_timestamp = self.clock.now_millis();
        let overwrites = self.deployments.calculate_overwrites(&tx, entity)?;
        let deployment = self.deployments.save_deployment(
            &mut tx,
            entity,
            audit,
            local_timestamp,
            overwrites.overwritten_by,
        )?;

        let resolution = self.pointer_manager.reference_entity_from_pointers(
            &mut tx,
            &self.deployments,
            entity,
            deployment.id,
        )?;

        let marked = self.deployments.set_entities_as_overwritten(
            &mut tx,
            &overwrites.overwrote,
            deployment.id,
        )?;

        self.content_files
            .save_content_files(&mut tx, deployment.id, &entity.content)?;

        if !resolution.deltas.is_empty() {
            self.pointer_changes.save_pointer_changes(
                &mut tx,
                &PointerChanges {
                    deployment_id: deployment.id,
                    entity_id: entity.id.clone(),
                    entity_type: entity.entity_type,
                    local_timestamp,
                    changes: resolution.deltas.clone(),
                },
            )?;
        }

        debug!(
            deployment_id = deployment.id,
            writes = tx.pending_writes(),
            "Committing deployment transaction"
        );
        tx.commit()?;

        self.cache
            .apply_delta(entity.entity_type, &entity.id, &resolution.deltas);
        DEPLOYMENTS_COMMITTED
            .with_label_values(&[entity.entity_type.as_str()])
            .inc();

        info!(
            entity_id = %entity.id,
            entity_type = %entity.entity_type,
            deployment_id = deployment.id,
            active = resolution.will_become_active,
            overwrote = marked.len(),
            overwritten_by = ?overwrites.overwritten_by,
            "Deployment committed"
        );

        Ok(DeploymentResult {
            deployment_id: deployment.id,
            entity_id: entity.id.clone(),
            local_timestamp,
            deltas: resolution.deltas,
            overwrote: overwrites.overwrote,
            overwritten_by: overwrites.overwritten_by,
        })
    }

    /// Active entity id per pointer, cache first.
    pub fn active_entity_ids(
        &self,
        entity_type: EntityType,
        pointers: &[Pointer],
    ) -> Result<BTreeMap<Pointer, EntityId>, DeploymentError> {
        let tx = StoreTransaction::begin(self.store.as_ref());
        let mut active = BTreeMap::new();

        for pointer in pointers {
            let entity_id = match self.cache.get(entity_type, pointer) {
                Some(cached) => cached,
                None => {
                    let found = self.pointer_manager.active_entity(
                        &tx,
                        &self.deployments,
                        entity_type,
                        pointer,
                    )?;
                    self.cache.populate(entity_type, pointer, found.clone());
                    found
                }
            };
            if let Some(entity_id) = entity_id {
                active.insert(pointer.clone(), entity_id);
            }
        }

        debug!(
            %entity_type,
            requested = pointers.len(),
            found = active.len(),
            "Active entities read"
        );
        Ok(active)
    }

    pub fn deployment(&self, entity_id: &str) -> Result<Option<Deployment>, DeploymentError> {
        let tx = StoreTransaction::begin(self.store.as_ref());
        self.deployments.get_deployment_by_entity(&tx, entity_id)
    }

    pub fn pointer_changes(
        &self,
        filter: &PointerChangesFilter,
    ) -> Result<Vec<PointerChanges>, DeploymentError> {
        let tx = StoreTransaction::begin(self.store.as_ref());
        self.pointer_changes.get_pointer_changes(&tx, filter)
    }

    pub fn content_hashes_not_being_used_anymore(
        &self,
        last_gc_time: Timestamp,
    ) -> Result<Vec<ContentHash>, DeploymentError> {
        let tx = StoreTransaction::begin(self.store.as_ref());
        self.content_files
            .find_content_hashes_not_being_used_anymore(&tx, &self.deployments, last_gc_time)
    }
}
