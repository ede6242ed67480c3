//! # Garbage Collection
//!
//! Sweeps interleaved with deployments must never delete a blob that a
//! current deployment references. Blobs referenced only by deployments
//! superseded after the last sweep are reclaimed by the next one.

use crate::fixtures::{audit, CLOCK_START};
use cs_02_deployments::{
    ContentFile, DeploymentApi, DeploymentService, EngineConfig, Entity, EntityType,
    GarbageCollectionManager, InMemoryContentStorage, InMemoryKVStore, LruActiveEntitiesCache,
    ManualClock, Timestamp,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const HASH_POOL: [&str; 5] = ["bafyA", "bafyB", "bafyC", "bafyD", "bafyE"];

/// Service, blob store and collector sharing one manual clock.
pub struct GcHarness {
    pub service: Arc<DeploymentService>,
    pub content: Arc<InMemoryContentStorage>,
    pub clock: Arc<ManualClock>,
    pub gc: GarbageCollectionManager,
}

impl GcHarness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(CLOCK_START));
        let service = Arc::new(
            DeploymentService::new(
                Arc::new(InMemoryKVStore::new()),
                Arc::new(LruActiveEntitiesCache::new(1_000)),
                clock.clone(),
                &EngineConfig::default(),
            )
            .expect("fresh store"),
        );
        let content = Arc::new(InMemoryContentStorage::new());
        let gc = GarbageCollectionManager::new(
            service.clone(),
            content.clone(),
            clock.clone(),
            Duration::from_secs(3600),
        );
        Self {
            service,
            content,
            clock,
            gc,
        }
    }

    /// Upload the blobs, then deploy.
    pub async fn deploy(&self, entity: Entity) {
        self.clock.advance(10);
        for file in &entity.content {
            self.content.store(file.hash.clone(), file.hash.as_bytes().to_vec());
        }
        self.service
            .deploy_entity(entity, audit())
            .await
            .expect("deploy");
    }

    pub async fn sweep(&self) -> Vec<String> {
        self.clock.advance(10);
        self.gc.perform_sweep().await.expect("sweep")
    }

    /// Hashes referenced by the currently active scenes on `pointers`.
    pub async fn live_hashes(&self, entities: &[Entity], pointers: &[&str]) -> BTreeSet<String> {
        let active = self
            .service
            .get_active_entity_ids(
                EntityType::Scene,
                pointers.iter().map(|p| p.to_string()).collect(),
            )
            .await
            .expect("active ids");
        let active: BTreeSet<_> = active.into_values().collect();
        entities
            .iter()
            .filter(|e| active.contains(&e.id))
            .flat_map(|e| e.content.iter().map(|f| f.hash.clone()))
            .collect()
    }
}

impl Default for GcHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn scene_with(id: &str, pointers: &[&str], timestamp: Timestamp, hashes: &[&str]) -> Entity {
    Entity::new(id, EntityType::Scene, pointers.iter().copied(), timestamp).with_content(
        hashes
            .iter()
            .enumerate()
            .map(|(i, h)| ContentFile::new(format!("file{}.bin", i), *h))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::sample::subsequence;

    const POINTERS: [&str; 4] = ["0,0", "0,1", "1,0", "1,1"];

    #[tokio::test]
    async fn test_shared_blob_survives_while_any_owner_is_current() {
        let h = GcHarness::new();
        h.deploy(scene_with("a", &["0,0"], 1, &["bafyA", "bafyB"])).await;
        h.deploy(scene_with("b", &["0,1"], 1, &["bafyB"])).await;
        h.deploy(scene_with("a2", &["0,0"], 2, &["bafyC"])).await;

        assert_eq!(h.sweep().await, vec!["bafyA".to_string()]);
        assert!(h.content.contains("bafyB"));

        h.deploy(scene_with("b2", &["0,1"], 2, &["bafyD"])).await;
        assert_eq!(h.sweep().await, vec!["bafyB".to_string()]);
        assert!(h.content.contains("bafyC"));
        assert!(h.content.contains("bafyD"));
    }

    #[tokio::test]
    async fn test_blob_reused_by_a_new_deployment_is_kept() {
        let h = GcHarness::new();
        h.deploy(scene_with("a", &["0,0"], 1, &["bafyA"])).await;
        h.deploy(scene_with("a2", &["0,0"], 2, &["bafyA"])).await;

        assert!(h.sweep().await.is_empty());
        assert!(h.content.contains("bafyA"));
    }

    #[tokio::test]
    async fn test_late_arrival_superseded_before_watermark_is_skipped() {
        let h = GcHarness::new();
        h.deploy(scene_with("newer", &["0,0"], 5, &["bafyB"])).await;
        assert!(h.sweep().await.is_empty());

        // Born superseded by a deployment older than the watermark: leaked,
        // never unsafely deleted.
        h.deploy(scene_with("older", &["0,0"], 1, &["bafyA"])).await;
        assert!(h.sweep().await.is_empty());
        assert!(h.content.contains("bafyA"));
        assert!(h.content.contains("bafyB"));
    }

    #[derive(Debug, Clone)]
    struct Step {
        pointers: Vec<&'static str>,
        timestamp: Timestamp,
        hashes: Vec<&'static str>,
        sweep_after: bool,
    }

    fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
        prop::collection::vec(
            (
                subsequence(POINTERS.to_vec(), 1..=2),
                0u64..20,
                subsequence(HASH_POOL.to_vec(), 1..=2),
                prop::bool::weighted(0.3),
            )
                .prop_map(|(pointers, timestamp, hashes, sweep_after)| Step {
                    pointers,
                    timestamp,
                    hashes,
                    sweep_after,
                }),
            1..14,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_sweeps_never_delete_live_content(steps in arb_steps()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let h = GcHarness::new();
                let mut entities = Vec::new();

                for (i, step) in steps.iter().enumerate() {
                    let entity = scene_with(
                        &format!("bafy-entity-{}", i),
                        &step.pointers,
                        step.timestamp,
                        &step.hashes,
                    );
                    entities.push(entity.clone());
                    h.deploy(entity).await;

                    if step.sweep_after {
                        h.sweep().await;
                        let live = h.live_hashes(&entities, &POINTERS).await;
                        for hash in &live {
                            assert!(h.content.contains(hash), "deleted live blob {}", hash);
                        }
                    }
                }

                h.sweep().await;
                for hash in h.live_hashes(&entities, &POINTERS).await {
                    assert!(h.content.contains(&hash), "deleted live blob {}", hash);
                }
            });
        }
    }
}
