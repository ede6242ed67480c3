//! # Reference Scenarios
//!
//! The five canonical deployment scenarios, driven through the async
//! `DeploymentApi` the way the deployment pipeline calls it.

#[cfg(test)]
mod tests {
    use crate::fixtures::{audit, pointers, profile, scene, service};
    use cs_01_admission_queue::QueueConfig;
    use cs_02_deployments::{
        happened_before, DeploymentApi, DeploymentDelta, DeploymentError, EntityType,
        PointerChangesFilter, PointerState,
    };

    fn set(before: Option<u64>) -> DeploymentDelta {
        DeploymentDelta::new(before, PointerState::Set)
    }

    fn cleared(before: Option<u64>) -> DeploymentDelta {
        DeploymentDelta::new(before, PointerState::Cleared)
    }

    #[tokio::test]
    async fn test_scenario_1_first_deployment_sets_pointer() {
        let (service, _) = service(QueueConfig::default());

        let e1 = service
            .deploy_entity(scene("e1", &["P1"], 1), audit())
            .await
            .unwrap();

        assert_eq!(e1.deltas.len(), 1);
        assert_eq!(e1.deltas["p1"], set(None));
        assert!(e1.overwrote.is_empty());
        assert_eq!(e1.overwritten_by, None);
    }

    #[tokio::test]
    async fn test_scenario_2_later_deployment_overwrites() {
        let (service, _) = service(QueueConfig::default());

        let e1 = service
            .deploy_entity(scene("e1", &["p1", "p2"], 1), audit())
            .await
            .unwrap();
        let e3 = service
            .deploy_entity(scene("e3", &["p1", "p2", "p3"], 3), audit())
            .await
            .unwrap();

        assert_eq!(e3.deltas["p1"], set(Some(e1.deployment_id)));
        assert_eq!(e3.deltas["p2"], set(Some(e1.deployment_id)));
        assert_eq!(e3.deltas["p3"], set(None));
        assert_eq!(e3.overwrote, [e1.deployment_id].into_iter().collect());

        let e1_row = service.get_deployment("e1".into()).await.unwrap().unwrap();
        assert_eq!(e1_row.deleter_deployment, Some(e3.deployment_id));
    }

    #[tokio::test]
    async fn test_scenario_3_older_deployment_arriving_late() {
        let (service, _) = service(QueueConfig::default());

        let e3 = service
            .deploy_entity(scene("e3", &["p1", "p2", "p3"], 3), audit())
            .await
            .unwrap();
        let e1 = service
            .deploy_entity(scene("e1", &["p1", "p2"], 1), audit())
            .await
            .unwrap();

        assert!(e1.deltas.is_empty());
        assert!(!e1.is_active());

        // e3 is untouched and still active everywhere
        let e3_row = service.get_deployment("e3".into()).await.unwrap().unwrap();
        assert_eq!(e3_row.deleter_deployment, None);
        let active = service
            .get_active_entity_ids(EntityType::Scene, pointers(&["p1", "p2", "p3"]))
            .await
            .unwrap();
        assert!(active.values().all(|id| id == "e3"));
        assert_eq!(active.len(), 3);

        // born superseded: e1's own call records e3 as its deleter
        let e1_row = service.get_deployment("e1".into()).await.unwrap().unwrap();
        assert_eq!(e1_row.deleter_deployment, Some(e3.deployment_id));
    }

    #[tokio::test]
    async fn test_scenario_4_equal_timestamps_tie_break_on_id() {
        let aaa = scene("aaa", &["p1"], 42);
        let bbb = scene("bbb", &["p1"], 42);
        assert!(happened_before(&aaa, &bbb));
        assert!(!happened_before(&bbb, &aaa));

        for order in [[&aaa, &bbb], [&bbb, &aaa]] {
            let (service, _) = service(QueueConfig::default());
            for entity in order {
                service.deploy_entity(entity.clone(), audit()).await.unwrap();
            }
            let active = service
                .get_active_entity_ids(EntityType::Scene, pointers(&["p1"]))
                .await
                .unwrap();
            assert_eq!(active["p1"], "bbb");
        }
    }

    #[tokio::test]
    async fn test_scenario_5_partial_overwrite_clears_remaining_pointers() {
        let (service, _) = service(QueueConfig::default());

        let e1 = service
            .deploy_entity(scene("e1", &["p1", "p2"], 1), audit())
            .await
            .unwrap();
        let e2 = service
            .deploy_entity(scene("e2", &["p2"], 2), audit())
            .await
            .unwrap();

        assert_eq!(e2.deltas.len(), 2);
        assert_eq!(e2.deltas["p2"], set(Some(e1.deployment_id)));
        assert_eq!(e2.deltas["p1"], cleared(Some(e1.deployment_id)));

        let active = service
            .get_active_entity_ids(EntityType::Scene, pointers(&["p1", "p2"]))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active["p2"], "e2");
    }

    #[tokio::test]
    async fn test_entity_types_are_independent_pointer_spaces() {
        let (service, _) = service(QueueConfig::default());

        service
            .deploy_entity(scene("scene-1", &["0xabc"], 10), audit())
            .await
            .unwrap();
        let p = service
            .deploy_entity(profile("0xabc", 5), audit())
            .await
            .unwrap();

        assert_eq!(p.deltas["0xabc"], set(None));
        let scenes = service
            .get_active_entity_ids(EntityType::Scene, pointers(&["0xabc"]))
            .await
            .unwrap();
        assert_eq!(scenes["0xabc"], "scene-1");
    }

    #[tokio::test]
    async fn test_redeploying_same_entity_is_terminal() {
        let (service, _) = service(QueueConfig::default());
        service
            .deploy_entity(scene("e1", &["p1"], 1), audit())
            .await
            .unwrap();

        let err = service
            .deploy_entity(scene("e1", &["p1"], 1), audit())
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::AlreadyDeployed { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_pointer_changes_feed_follows_local_time() {
        let (service, clock) = service(QueueConfig::default());

        clock.advance(10);
        service
            .deploy_entity(scene("e1", &["p1"], 1), audit())
            .await
            .unwrap();
        let checkpoint = clock.advance(10);
        service
            .deploy_entity(scene("e2", &["p1", "p2"], 2), audit())
            .await
            .unwrap();

        let recent = service
            .get_pointer_changes(PointerChangesFilter {
                from_local_timestamp: Some(checkpoint),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].entity_id, "e2");
        assert_eq!(recent[0].changes.len(), 2);
    }
}
