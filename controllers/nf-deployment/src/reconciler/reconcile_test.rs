//! Unit tests for full reconcile attempts against the mock cluster

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::builder::CONFIG_FINGERPRINT_ANNOTATION;
    use crate::reconciler::status::{REASON_NOT_READY, REASON_READY};
    use crate::reconciler::{ReconcileOutcome, SkipReason};
    use crate::test_utils::*;
    use cluster_client::{ChildResource, MockClusterClient, MockOperation, ResourceKind};
    use crds::{CONDITION_AVAILABLE, CONDITION_READY, ConditionStatus, NFDeployment, ParameterValue};
    use k8s_openapi::api::apps::v1::Deployment;
    use std::time::Duration;
    use tokio::time::Instant;

    fn seed(mock: &MockClusterClient, provider: &str, params: &[(&str, &str)]) -> NFDeployment {
        mock.insert_nf_deployment(create_test_nf_deployment("ns", "foo", provider, params))
    }

    fn deployment(mock: &MockClusterClient, name: &str) -> Deployment {
        match mock.object(ResourceKind::Deployment, "ns", name) {
            Some(ChildResource::Deployment(d)) => d,
            other => panic!("expected Deployment ns/{}, got {:?}", name, other),
        }
    }

    fn fingerprint_of(deployment: &Deployment) -> Option<String> {
        deployment
            .spec
            .as_ref()?
            .template
            .metadata
            .as_ref()?
            .annotations
            .as_ref()?
            .get(CONFIG_FINGERPRINT_ANNOTATION)
            .cloned()
    }

    #[tokio::test]
    async fn test_upf_large_end_to_end() {
        let mock = MockClusterClient::new();
        let intent = seed(&mock, "upf", &[("capacity", "large")]);
        let reconciler = create_test_reconciler(&mock);

        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(TEST_REQUEUE));

        let cm = mock.object(ResourceKind::ConfigMap, "ns", "foo").unwrap();
        let data = cm.as_config_map().unwrap().data.clone().unwrap();
        assert!(data["upf.yaml"].contains("capacity: large"));

        let d = deployment(&mock, "foo");
        let spec = d.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(1));
        let container = &spec.template.spec.as_ref().unwrap().containers[0];
        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits["cpu"].0, "4000m");
        assert_eq!(limits["memory"].0, "4Gi");

        let svc = mock.object(ResourceKind::Service, "ns", "foo").unwrap();
        let svc_spec = svc.as_service().unwrap().spec.clone().unwrap();
        let port = &svc_spec.ports.unwrap()[0];
        assert_eq!((port.port, port.protocol.as_deref()), (8805, Some("UDP")));
        assert_eq!(svc_spec.selector.unwrap()["name"], "foo");

        for kind in [ResourceKind::ConfigMap, ResourceKind::Deployment, ResourceKind::Service] {
            let obj = mock.object(kind, "ns", "foo").unwrap();
            let refs = obj.metadata().owner_references.clone().unwrap();
            assert_eq!(refs.len(), 1, "{}", kind);
            assert_eq!(Some(&refs[0].uid), intent.metadata.uid.as_ref());
            assert_eq!(refs[0].controller, Some(true));
            assert_eq!(refs[0].block_owner_deletion, Some(true));
        }
    }

    #[tokio::test]
    async fn test_deployment_carries_config_map_fingerprint() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        let reconciler = create_test_reconciler(&mock);
        reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();

        let cm = mock.object(ResourceKind::ConfigMap, "ns", "foo").unwrap();
        let expected = crate::reconciler::builder::fingerprint(cm.as_config_map().unwrap().data.as_ref().unwrap());
        assert_eq!(fingerprint_of(&deployment(&mock, "foo")), Some(expected));
    }

    #[tokio::test]
    async fn test_second_attempt_converges_without_writes() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        let reconciler = create_test_reconciler(&mock);

        reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(mock.total_writes(), 3);
        assert_eq!(mock.status_update_count(), 1);
        mock.reset_counters();

        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Converged);
        assert_eq!(mock.total_writes(), 0);
        assert_eq!(mock.status_update_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_skipped_without_writes() {
        let mock = MockClusterClient::new();
        seed(&mock, "ausf.sdcore.io", &[("capacity", "large")]);
        let reconciler = create_test_reconciler(&mock);

        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Skipped(SkipReason::UnknownProvider("ausf.sdcore.io".to_string()))
        );
        assert_eq!(mock.total_writes(), 0);
        assert_eq!(mock.status_update_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_intent_is_skipped() {
        let mock = MockClusterClient::new();
        let reconciler = create_test_reconciler(&mock);

        let outcome = reconciler.reconcile("ns", "gone", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::NotFound));
        assert_eq!(outcome.label(), "skipped");
    }

    #[tokio::test]
    async fn test_invalid_capacity_fails_before_any_write() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[("capacity", "huge")]);
        let reconciler = create_test_reconciler(&mock);

        let err = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidParameter(_)));
        assert!(!err.is_retriable());
        assert_eq!(mock.total_writes(), 0);
    }

    #[tokio::test]
    async fn test_status_follows_deployment_readiness() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        let reconciler = create_test_reconciler(&mock);

        reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        let status = mock.nf_deployment("ns", "foo").unwrap().status.unwrap();
        assert_eq!(status.observed_generation, Some(1));
        assert_eq!(status.condition(CONDITION_AVAILABLE).unwrap().status, ConditionStatus::False);
        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.reason, REASON_NOT_READY);
        assert_eq!(ready.message, "UPF is not ready");

        assert!(mock.set_deployment_ready("ns", "foo", 1));
        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Converged);
        assert_eq!(mock.status_update_count(), 2);

        let status = mock.nf_deployment("ns", "foo").unwrap().status.unwrap();
        assert_eq!(status.condition(CONDITION_AVAILABLE).unwrap().status, ConditionStatus::True);
        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.reason, REASON_READY);
        assert_eq!(ready.message, "UPF is ready");

        // nothing new to report
        reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(mock.status_update_count(), 2);
    }

    #[tokio::test]
    async fn test_capacity_change_rolls_deployment() {
        let mock = MockClusterClient::new();
        let mut intent = seed(&mock, "upf", &[("capacity", "small")]);
        let reconciler = create_test_reconciler(&mock);
        reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        let before = fingerprint_of(&deployment(&mock, "foo"));
        mock.reset_counters();

        intent.spec.parameter_values = vec![ParameterValue::new("capacity", "medium")];
        mock.insert_nf_deployment(intent);

        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(TEST_REQUEUE));
        assert_eq!(mock.update_count(ResourceKind::ConfigMap), 1);
        assert_eq!(mock.update_count(ResourceKind::Deployment), 1);
        assert_eq!(mock.update_count(ResourceKind::Service), 0);

        let after = deployment(&mock, "foo");
        assert_ne!(fingerprint_of(&after), before);
        assert_eq!(after.metadata.generation, Some(2));
        let status = mock.nf_deployment("ns", "foo").unwrap().status.unwrap();
        assert_eq!(status.observed_generation, Some(2));
    }

    #[tokio::test]
    async fn test_capacity_change_resizes_amf() {
        let mock = MockClusterClient::new();
        let mut intent = mock.insert_nf_deployment(create_test_nf_deployment(
            "ns",
            "amf",
            "amf",
            &[("capacity", "small")],
        ));
        let reconciler = create_test_reconciler(&mock);
        reconciler.reconcile("ns", "amf", far_deadline()).await.unwrap();
        let before = fingerprint_of(&deployment(&mock, "amf"));
        mock.reset_counters();

        intent.spec.parameter_values = vec![ParameterValue::new("capacity", "large")];
        mock.insert_nf_deployment(intent);

        let outcome = reconciler.reconcile("ns", "amf", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(TEST_REQUEUE));
        // AMF config is capacity independent, only the Deployment moves
        assert_eq!(mock.update_count(ResourceKind::ConfigMap), 0);
        assert_eq!(mock.update_count(ResourceKind::Deployment), 1);

        let after = deployment(&mock, "amf");
        assert_eq!(fingerprint_of(&after), before);
        let container = &after.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0];
        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits["cpu"].0, "2000m");
        assert_eq!(limits["memory"].0, "2Gi");

        mock.reset_counters();
        let outcome = reconciler.reconcile("ns", "amf", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Converged);
        assert_eq!(mock.total_writes(), 0);
    }

    #[tokio::test]
    async fn test_unused_malformed_interface_is_ignored() {
        let mock = MockClusterClient::new();
        let mut intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        intent.spec.interfaces = vec![create_test_interface("n6", "dhcp")];
        mock.insert_nf_deployment(intent);
        let reconciler = create_test_reconciler(&mock);

        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(TEST_REQUEUE));
    }

    #[tokio::test]
    async fn test_malformed_used_interface_fails_before_any_write() {
        let mock = MockClusterClient::new();
        let mut intent = create_test_nf_deployment("ns", "amf", "amf", &[]);
        intent.spec.interfaces = vec![create_test_interface("n2", "dhcp")];
        mock.insert_nf_deployment(intent);
        let reconciler = create_test_reconciler(&mock);

        let err = reconciler.reconcile("ns", "amf", far_deadline()).await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidParameter(_)));
        assert!(err.to_string().contains("n2"));
        assert_eq!(mock.total_writes(), 0);
    }

    #[tokio::test]
    async fn test_amf_creates_headless_service() {
        let mock = MockClusterClient::new();
        mock.insert_nf_deployment(create_test_nf_deployment("ns", "amf", "amf.sdcore.io", &[]));
        let reconciler = create_test_reconciler(&mock);

        reconciler.reconcile("ns", "amf", far_deadline()).await.unwrap();

        assert_eq!(mock.create_count(ResourceKind::Service), 2);
        let headless = mock.object(ResourceKind::Service, "ns", "amf-headless").unwrap();
        let spec = headless.as_service().unwrap().spec.clone().unwrap();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
    }

    #[tokio::test]
    async fn test_every_provider_reconciles() {
        for provider in ["upf", "amf", "smf", "nrf", "nssf", "nef"] {
            let mock = MockClusterClient::new();
            seed(&mock, &format!("{}.sdcore.io", provider), &[("capacity", "medium")]);
            let reconciler = create_test_reconciler(&mock);

            let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
            assert_eq!(outcome, ReconcileOutcome::RequeueAfter(TEST_REQUEUE), "{}", provider);
            assert_eq!(mock.object_count(ResourceKind::ConfigMap), 1, "{}", provider);
            assert_eq!(mock.object_count(ResourceKind::Deployment), 1, "{}", provider);
        }
    }

    #[tokio::test]
    async fn test_failed_apply_stops_pipeline_and_retry_converges() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        let reconciler = create_test_reconciler(&mock);
        mock.fail_on(MockOperation::Create(ResourceKind::Deployment));

        let err = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::ResourceApplyFailed {
                kind: ResourceKind::Deployment,
                ..
            }
        ));
        assert!(err.is_retriable());
        // ConfigMap stays, nothing after the Deployment was attempted
        assert_eq!(mock.object_count(ResourceKind::ConfigMap), 1);
        assert_eq!(mock.object_count(ResourceKind::Service), 0);
        assert_eq!(mock.status_update_count(), 0);

        mock.clear_failure(MockOperation::Create(ResourceKind::Deployment));
        let outcome = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::RequeueAfter(TEST_REQUEUE));
        assert_eq!(mock.create_count(ResourceKind::ConfigMap), 1);
        assert_eq!(mock.object_count(ResourceKind::Service), 1);
    }

    #[tokio::test]
    async fn test_intent_fetch_failure() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        mock.fail_on(MockOperation::GetIntent);
        let reconciler = create_test_reconciler(&mock);

        let err = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap_err();
        assert!(matches!(err, ControllerError::IntentFetchFailed { .. }));
        assert_eq!(mock.total_writes(), 0);
    }

    #[tokio::test]
    async fn test_status_update_failure() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        mock.fail_on(MockOperation::UpdateStatus);
        let reconciler = create_test_reconciler(&mock);

        let err = reconciler.reconcile("ns", "foo", far_deadline()).await.unwrap_err();
        assert!(matches!(err, ControllerError::StatusUpdateFailed { .. }));
        assert!(err.is_retriable());
        assert_eq!(mock.total_writes(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_respects_deadline() {
        let mock = MockClusterClient::new();
        seed(&mock, "upf", &[]);
        mock.set_latency(Some(Duration::from_millis(300)));
        let reconciler = create_test_reconciler(&mock);

        // fetch, get + create ConfigMap fit; the Deployment does not
        let deadline = Instant::now() + Duration::from_millis(1000);
        let err = reconciler.reconcile("ns", "foo", deadline).await.unwrap_err();

        assert!(matches!(err, ControllerError::DeadlineExceeded(_)));
        assert_eq!(mock.create_count(ResourceKind::ConfigMap), 1);
        assert_eq!(mock.create_count(ResourceKind::Deployment), 0);
    }
}
