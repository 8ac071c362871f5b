//! Unit tests for the resource builder

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::builder::*;
    use crate::reconciler::params::{self, Capacity, Parameters};
    use crate::reconciler::providers::{AMF, NRF, SMF, UPF};
    use crate::test_utils::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::Container;
    use std::collections::BTreeMap;

    fn container(deployment: &Deployment) -> &Container {
        &deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    fn quantity(deployment: &Deployment, section: &str, resource: &str) -> String {
        let resources = container(deployment).resources.as_ref().unwrap();
        let map = match section {
            "requests" => resources.requests.as_ref(),
            _ => resources.limits.as_ref(),
        };
        map.unwrap()[resource].0.clone()
    }

    fn template_annotation<'a>(deployment: &'a Deployment, key: &str) -> Option<&'a String> {
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.annotations.as_ref())
            .and_then(|a| a.get(key))
    }

    fn params_for(capacity: Capacity) -> Parameters {
        Parameters {
            capacity,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[("capacity", "medium")]);
        let params = params::extract(&intent.spec).unwrap();

        let first = build(&UPF, &intent, &params, Some("abc")).unwrap();
        let second = build(&UPF, &intent, &params, Some("abc")).unwrap();

        assert_eq!(first.config_map, second.config_map);
        assert_eq!(first.deployment, second.deployment);
        assert_eq!(first.services, second.services);
    }

    #[test]
    fn test_upf_capacity_table() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        let expected = [
            (Capacity::Small, "500m", "512Mi", "1000m", "1Gi"),
            (Capacity::Medium, "1000m", "1Gi", "2000m", "2Gi"),
            (Capacity::Large, "2000m", "2Gi", "4000m", "4Gi"),
        ];

        for (capacity, cpu_req, mem_req, cpu_lim, mem_lim) in expected {
            let deployment = build_deployment(&UPF, &intent, &params_for(capacity), None).unwrap();
            assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(1), "{}", capacity);
            assert_eq!(quantity(&deployment, "requests", "cpu"), cpu_req, "{}", capacity);
            assert_eq!(quantity(&deployment, "requests", "memory"), mem_req, "{}", capacity);
            assert_eq!(quantity(&deployment, "limits", "cpu"), cpu_lim, "{}", capacity);
            assert_eq!(quantity(&deployment, "limits", "memory"), mem_lim, "{}", capacity);
        }
    }

    #[test]
    fn test_amf_capacity_table() {
        let intent = create_test_nf_deployment("ns", "amf", "amf", &[]);
        let expected = [
            (Capacity::Small, "500m", "512Mi"),
            (Capacity::Medium, "1000m", "1Gi"),
            (Capacity::Large, "2000m", "2Gi"),
        ];

        for (capacity, cpu, memory) in expected {
            let deployment = build_deployment(&AMF, &intent, &params_for(capacity), None).unwrap();
            assert_eq!(quantity(&deployment, "requests", "cpu"), cpu);
            assert_eq!(quantity(&deployment, "limits", "cpu"), cpu);
            assert_eq!(quantity(&deployment, "requests", "memory"), memory);
            assert_eq!(quantity(&deployment, "limits", "memory"), memory);
        }
    }

    #[test]
    fn test_invalid_capacity_yields_no_resources() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[("capacity", "huge")]);
        let result = params::extract(&intent.spec).and_then(|p| build(&UPF, &intent, &p, None));
        assert!(matches!(result, Err(ControllerError::InvalidParameter(_))));
    }

    #[test]
    fn test_config_map_reflects_capacity() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[("capacity", "large")]);
        let params = params::extract(&intent.spec).unwrap();
        let cm = build_config_map(&UPF, &intent, &params).unwrap();

        assert_eq!(cm.metadata.name.as_deref(), Some("foo"));
        assert_eq!(cm.metadata.namespace.as_deref(), Some("ns"));
        let data = cm.data.unwrap();
        assert!(data["upf.yaml"].contains("capacity: large"));
        assert!(data["upf.yaml"].contains("dns: 8.8.8.8"));
        assert!(data.contains_key("wrapper.sh"));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = BTreeMap::from([("upf.yaml".to_string(), "capacity: small\n".to_string())]);
        let b = BTreeMap::from([("upf.yaml".to_string(), "capacity: large\n".to_string())]);

        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);

        // key/value boundaries are part of the hash
        let c = BTreeMap::from([("ab".to_string(), "c".to_string())]);
        let d = BTreeMap::from([("a".to_string(), "bc".to_string())]);
        assert_ne!(fingerprint(&c), fingerprint(&d));
    }

    #[test]
    fn test_deployment_carries_fingerprint() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        let params = Parameters::default();

        let with = build_deployment(&UPF, &intent, &params, Some("v2")).unwrap();
        assert_eq!(
            template_annotation(&with, CONFIG_FINGERPRINT_ANNOTATION).map(String::as_str),
            Some("v2")
        );

        let without = build_deployment(&NRF, &intent, &params, None).unwrap();
        assert!(template_annotation(&without, CONFIG_FINGERPRINT_ANNOTATION).is_none());
    }

    #[test]
    fn test_deployment_records_capacity_tier() {
        let intent = create_test_nf_deployment("core", "amf", "amf", &[]);
        let large = build_deployment(&AMF, &intent, &params_for(Capacity::Large), None).unwrap();
        assert_eq!(
            template_annotation(&large, RESOURCES_ANNOTATION).map(String::as_str),
            Some("cpu=2000m/2000m,memory=2Gi/2Gi,replicas=1")
        );

        let small = build_deployment(&AMF, &intent, &params_for(Capacity::Small), None).unwrap();
        assert_ne!(
            template_annotation(&small, RESOURCES_ANNOTATION),
            template_annotation(&large, RESOURCES_ANNOTATION)
        );
    }

    #[test]
    fn test_malformed_interface_fails_config_render() {
        let mut intent = create_test_nf_deployment("core", "smf", "smf", &[]);
        intent.spec.interfaces = vec![create_test_interface("n4", "dhcp")];
        let params = params::extract(&intent.spec).unwrap();

        let err = build(&SMF, &intent, &params, None).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidParameter(_)));

        // UPF never reads n4, so the same intent renders
        assert!(build(&UPF, &intent, &params, None).is_ok());
    }

    #[test]
    fn test_stamp_matches_build_with_fingerprint() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        let params = Parameters::default();

        let mut stamped = build_deployment(&UPF, &intent, &params, None).unwrap();
        stamp_fingerprint(&mut stamped, "v3");
        let built = build_deployment(&UPF, &intent, &params, Some("v3")).unwrap();

        assert_eq!(stamped, built);
        // the network attachment annotation survives
        assert!(template_annotation(&stamped, NETWORKS_ANNOTATION).is_some());
    }

    #[test]
    fn test_upf_deployment_shape() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        let deployment = build_deployment(&UPF, &intent, &Parameters::default(), None).unwrap();
        let spec = deployment.spec.as_ref().unwrap();

        assert_eq!(spec.selector.match_labels, Some(selector("foo")));
        assert!(template_annotation(&deployment, NETWORKS_ANNOTATION).is_some());

        let c = container(&deployment);
        assert_eq!(c.image.as_deref(), Some(UPF.image));
        let caps = c.security_context.as_ref().unwrap().capabilities.as_ref().unwrap();
        assert_eq!(caps.add, Some(vec!["NET_ADMIN".to_string()]));
        assert_eq!(c.volume_mounts.as_ref().unwrap()[0].mount_path, "/config/");

        let volume = &spec.template.spec.as_ref().unwrap().volumes.as_ref().unwrap()[0];
        let source = volume.config_map.as_ref().unwrap();
        assert_eq!(source.name, "foo");
        assert_eq!(source.default_mode, Some(0o777));
    }

    #[test]
    fn test_upf_service() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        let services = build_services(&UPF, &intent).unwrap();
        assert_eq!(services.len(), 1);

        let spec = services[0].spec.as_ref().unwrap();
        assert_eq!(services[0].metadata.name.as_deref(), Some("foo"));
        assert_eq!(spec.selector, Some(selector("foo")));
        let port = &spec.ports.as_ref().unwrap()[0];
        assert_eq!(port.port, 8805);
        assert_eq!(port.protocol.as_deref(), Some("UDP"));
        assert!(spec.cluster_ip.is_none());
    }

    #[test]
    fn test_amf_headless_service() {
        let intent = create_test_nf_deployment("core", "amf", "amf", &[]);
        let services = build_services(&AMF, &intent).unwrap();
        assert_eq!(services.len(), 2);

        let headless = &services[1];
        assert_eq!(headless.metadata.name.as_deref(), Some("amf-headless"));
        let spec = headless.spec.as_ref().unwrap();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.selector, Some(selector("amf")));
        assert_eq!(spec.ports.as_ref().unwrap()[0].port, 9000);

        let ngap = &services[0].spec.as_ref().unwrap().ports.as_ref().unwrap()[0];
        assert_eq!(ngap.port, 38412);
        assert_eq!(ngap.protocol.as_deref(), Some("SCTP"));
    }

    #[test]
    fn test_amf_pod_ip_from_downward_api() {
        let intent = create_test_nf_deployment("core", "amf", "amf", &[]);
        let deployment = build_deployment(&AMF, &intent, &Parameters::default(), None).unwrap();
        let env = container(&deployment).env.as_ref().unwrap();

        let pod_ip = env.iter().find(|e| e.name == "POD_IP").unwrap();
        let field = pod_ip.value_from.as_ref().unwrap().field_ref.as_ref().unwrap();
        assert_eq!(field.field_path, "status.podIP");
    }

    #[test]
    fn test_smf_uses_n4_interface() {
        let mut intent = create_test_nf_deployment("core", "smf", "smf", &[]);
        intent.spec.interfaces = vec![create_test_interface("n4", "10.10.4.2/24")];
        let params = params::extract(&intent.spec).unwrap();

        let cm = build_config_map(&SMF, &intent, &params).unwrap();
        let data = cm.data.unwrap();
        assert!(data.values().any(|v| v.contains("10.10.4.2")));
    }

    #[test]
    fn test_labels() {
        let intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        let cm = build_config_map(&UPF, &intent, &Parameters::default()).unwrap();
        let labels = cm.metadata.labels.unwrap();

        assert_eq!(labels["name"], "foo");
        assert_eq!(labels["app.kubernetes.io/name"], "upf");
        assert_eq!(labels["app.kubernetes.io/managed-by"], MANAGED_BY);
    }

    #[test]
    fn test_missing_namespace_rejected() {
        let mut intent = create_test_nf_deployment("ns", "foo", "upf", &[]);
        intent.metadata.namespace = None;
        let err = build_config_map(&UPF, &intent, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidParameter(_)));
    }
}
