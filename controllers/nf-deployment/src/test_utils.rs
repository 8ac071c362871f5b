//! Test utilities for unit testing the reconciler
//!
//! Fixtures for NFDeployment intents and a reconciler wired to the mock cluster.

use crate::reconciler::Reconciler;
use crate::reconciler::providers::ProviderRegistry;
use cluster_client::MockClusterClient;
use crds::{InterfaceConfig, Ipv4Config, NFDeployment, NFDeploymentSpec, ParameterValue};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::time::Duration;
use tokio::time::Instant;

pub const TEST_REQUEUE: Duration = Duration::from_secs(10);

/// NFDeployment `namespace/name` with the given provider and parameters
pub fn create_test_nf_deployment(
    namespace: &str,
    name: &str,
    provider: &str,
    params: &[(&str, &str)],
) -> NFDeployment {
    NFDeployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("{}-{}-uid", namespace, name)),
            generation: Some(1),
            ..Default::default()
        },
        spec: NFDeploymentSpec {
            provider: provider.to_string(),
            parameter_values: params.iter().map(|(n, v)| ParameterValue::new(*n, *v)).collect(),
            interfaces: Vec::new(),
        },
        status: None,
    }
}

pub fn create_test_interface(name: &str, address: &str) -> InterfaceConfig {
    InterfaceConfig {
        name: name.to_string(),
        ipv4: Some(Ipv4Config {
            address: address.to_string(),
            gateway: None,
        }),
        vlan_id: None,
    }
}

/// Reconciler over a clone of `mock`, so the test keeps a handle on the store
pub fn create_test_reconciler(mock: &MockClusterClient) -> Reconciler {
    let providers = ProviderRegistry::sdcore().expect("provider registry");
    Reconciler::new(Box::new(mock.clone()), providers, TEST_REQUEUE)
}

/// Deadline far enough away not to matter
pub fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}
