//! # Convergence
//!
//! Independent replicas fed the same deployments in different orders must
//! end with the same active entity on every pointer, and every step along
//! the way must keep the overwrite chain and the deltas consistent.

use cs_02_deployments::domain::invariants::{
    apply_deltas, expected_active_entities, invariant_append_only, invariant_delta_sound,
    invariant_single_active, ActiveMapping,
};
use cs_02_deployments::{
    ConsistencyEngine, Deployment, DeploymentId, Entity, EntityId, EntityType, Pointer,
};
use std::collections::BTreeMap;

/// Pointer pool small enough to force heavy overlap.
pub const POINTER_POOL: [&str; 6] = ["0,0", "0,1", "0,2", "1,0", "1,1", "1,2"];

/// Everything one replica ends up with.
pub struct ReplicaOutcome {
    pub active: BTreeMap<(EntityType, Pointer), EntityId>,
    pub deployments: Vec<Deployment>,
}

/// Deploy `entities` in order, checking the per-step invariants.
pub fn replay(engine: &ConsistencyEngine, entities: &[Entity]) -> ReplicaOutcome {
    let mut mapping = ActiveMapping::new();
    let mut deleters: BTreeMap<EntityId, Option<DeploymentId>> = BTreeMap::new();

    for entity in entities {
        let result = engine
            .deploy(entity, &crate::fixtures::audit())
            .expect("deploy");
        assert!(
            invariant_delta_sound(&mapping, entity.entity_type, &result.deltas),
            "unsound delta for {}: {:?}",
            entity.id,
            result.deltas
        );
        apply_deltas(
            &mut mapping,
            entity.entity_type,
            result.deployment_id,
            &result.deltas,
        );

        for (entity_id, before) in deleters.iter_mut() {
            let after = engine
                .deployment(entity_id)
                .expect("read")
                .expect("stored")
                .deleter_deployment;
            assert!(
                invariant_append_only(*before, after),
                "deleter of {} changed from {:?} to {:?}",
                entity_id,
                before,
                after
            );
            *before = after;
        }
        deleters.insert(entity.id.clone(), result.overwritten_by);
    }

    let deployments: Vec<Deployment> = entities
        .iter()
        .map(|e| engine.deployment(&e.id).expect("read").expect("stored"))
        .collect();
    assert!(invariant_single_active(&deployments));

    let mut active = BTreeMap::new();
    for entity_type in EntityType::ALL {
        let pointers: Vec<Pointer> = POINTER_POOL.iter().map(|p| p.to_string()).collect();
        for (pointer, entity_id) in engine
            .active_entity_ids(entity_type, &pointers)
            .expect("read")
        {
            active.insert((entity_type, pointer), entity_id);
        }
    }

    // deltas alone rebuild the read path
    let entity_of: BTreeMap<DeploymentId, EntityId> = deployments
        .iter()
        .map(|d| (d.id, d.entity_id.clone()))
        .collect();
    let replayed: BTreeMap<(EntityType, Pointer), EntityId> = mapping
        .into_iter()
        .map(|(key, id)| (key, entity_of[&id].clone()))
        .collect();
    assert_eq!(replayed, active);

    ReplicaOutcome {
        active,
        deployments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::engine;
    use proptest::prelude::*;
    use proptest::sample::subsequence;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn arb_entities(max: usize) -> impl Strategy<Value = Vec<Entity>> {
        prop::collection::vec(
            (
                0u64..4,
                subsequence(POINTER_POOL.to_vec(), 1..=3),
                prop::bool::weighted(0.8),
            ),
            1..max,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (timestamp, pointers, is_scene))| {
                    let entity_type = if is_scene {
                        EntityType::Scene
                    } else {
                        EntityType::Wearable
                    };
                    // ids deliberately not in index order so ties exercise the id rule
                    Entity::new(
                        format!("bafy{:03}", (i * 37) % 101),
                        entity_type,
                        pointers,
                        timestamp,
                    )
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_final_mapping_is_order_independent(
            (entities, shuffled) in arb_entities(12).prop_flat_map(|entities| {
                let shuffled = Just(entities.clone()).prop_shuffle();
                (Just(entities), shuffled)
            })
        ) {
            let (first, _) = engine();
            let (second, _) = engine();

            let a = replay(&first, &entities);
            let b = replay(&second, &shuffled);

            prop_assert_eq!(&a.active, &b.active);
            prop_assert_eq!(&a.active, &expected_active_entities(&entities));
        }

        #[test]
        fn prop_overwritten_set_is_order_independent(
            (entities, shuffled) in arb_entities(10).prop_flat_map(|entities| {
                let shuffled = Just(entities.clone()).prop_shuffle();
                (Just(entities), shuffled)
            })
        ) {
            let (first, _) = engine();
            let (second, _) = engine();

            let overwritten = |outcome: &ReplicaOutcome| -> Vec<(EntityId, bool)> {
                let mut v: Vec<_> = outcome
                    .deployments
                    .iter()
                    .map(|d| (d.entity_id.clone(), d.is_overwritten()))
                    .collect();
                v.sort();
                v
            };

            let a = replay(&first, &entities);
            let b = replay(&second, &shuffled);
            prop_assert_eq!(overwritten(&a), overwritten(&b));
        }
    }

    #[test]
    fn test_many_permutations_of_a_dense_parcel_grid() {
        let entities: Vec<Entity> = (0..16u64)
            .map(|i| {
                let pointers = [
                    POINTER_POOL[(i % 6) as usize],
                    POINTER_POOL[((i * 5 + 1) % 6) as usize],
                ];
                Entity::new(format!("grid{:02}", i), EntityType::Scene, pointers, i % 5)
            })
            .collect();
        let expected = expected_active_entities(&entities);

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut order = entities.clone();
            order.shuffle(&mut rng);
            let (replica, _) = engine();
            assert_eq!(replay(&replica, &order).active, expected);
        }
    }
}
