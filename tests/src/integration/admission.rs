//! # Admission and Contention
//!
//! End-to-end behaviour of the admission queue in front of the engine:
//! contention errors, LOW-priority shedding and caller-side timeouts that do
//! not cancel an admitted deployment.

#[cfg(test)]
mod tests {
    use crate::fixtures::{audit, pointers, scene, service};
    use cs_01_admission_queue::{Priority, QueueConfig, QueueError};
    use cs_02_deployments::{DeploymentApi, DeploymentError, EntityType};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn tight_queue(max_queued: usize, timeout: Duration) -> QueueConfig {
        QueueConfig {
            max_concurrency: 1,
            max_queued,
            timeout,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_priority_deployments_bypass_saturation() {
        let (service, _) = service(tight_queue(0, Duration::from_secs(60)));

        let queue = service.queue().clone();
        let (release, released) = oneshot::channel::<()>();
        let blocker = tokio::spawn(async move {
            queue
                .submit(Priority::Low, async move {
                    let _ = released.await;
                })
                .await
        });
        tokio::task::yield_now().await;

        // reads are shed
        let read = service
            .get_active_entity_ids(EntityType::Scene, pointers(&["0,0"]))
            .await
            .unwrap_err();
        assert!(matches!(
            read,
            DeploymentError::Queue(QueueError::Saturated { .. })
        ));
        catalyst_telemetry::register_metrics().unwrap();
        let exported = catalyst_telemetry::encode_metrics().unwrap();
        assert!(exported.contains("catalyst_queue_rejected_total{reason=\"saturated\"}"));

        // writes wait for the slot instead
        let deploy = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .deploy_entity(scene("e1", &["0,0"], 1), audit())
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(service.queue().pending_in_queue(), 1);

        release.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        let result = deploy.await.unwrap().unwrap();
        assert!(result.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_while_waiting_frees_pointers() {
        let (service, _) = service(tight_queue(10, Duration::from_secs(5)));

        let queue = service.queue().clone();
        let (release, released) = oneshot::channel::<()>();
        let blocker = tokio::spawn(async move {
            queue
                .submit(Priority::High, async move {
                    let _ = released.await;
                })
                .await
        });
        tokio::task::yield_now().await;

        // waits behind the blocker past its deadline
        let err = service
            .deploy_entity(scene("e1", &["0,0"], 1), audit())
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Queue(QueueError::Timeout { .. })));
        assert!(err.is_retryable());

        // the blocker also timed out for its caller, but still holds the slot
        assert!(matches!(
            blocker.await.unwrap(),
            Err(QueueError::Timeout { .. })
        ));
        release.send(()).unwrap();

        // nothing was admitted for e1, so pointers are free again
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(service.pointers_in_flight(), 0);
        let retried = service
            .deploy_entity(scene("e1", &["0,0"], 1), audit())
            .await
            .unwrap();
        assert!(retried.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contention_is_per_pointer_and_retryable() {
        let (service, _) = service(tight_queue(10, Duration::from_secs(60)));

        let queue = service.queue().clone();
        let (release, released) = oneshot::channel::<()>();
        let blocker = tokio::spawn(async move {
            queue
                .submit(Priority::High, async move {
                    let _ = released.await;
                })
                .await
        });
        tokio::task::yield_now().await;

        let first = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .deploy_entity(scene("left", &["0,0", "0,1"], 1), audit())
                    .await
            })
        };
        let disjoint = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .deploy_entity(scene("right", &["5,5"], 1), audit())
                    .await
            })
        };
        tokio::task::yield_now().await;

        let err = service
            .deploy_entity(scene("overlap", &["0,1", "0,2"], 2), audit())
            .await
            .unwrap_err();
        match err {
            DeploymentError::PointersBeingDeployed { pointers } => {
                assert_eq!(pointers, vec!["0,1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        release.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        first.await.unwrap().unwrap();
        disjoint.await.unwrap().unwrap();

        let retried = service
            .deploy_entity(scene("overlap", &["0,1", "0,2"], 2), audit())
            .await
            .unwrap();
        assert_eq!(retried.overwrote.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_deployments_all_commit() {
        let (service, _) = service(QueueConfig::default());

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let pointer = format!("{},{}", i / 8, i % 8);
                    service
                        .deploy_entity(scene(&format!("e{}", i), &[pointer.as_str()], i), audit())
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(service.queue().being_executed(), 0);
        assert_eq!(service.pointers_in_flight(), 0);
    }
}
