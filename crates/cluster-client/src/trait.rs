//! ClusterClient trait for mocking
//!
//! The concrete [`KubeClusterClient`](crate::KubeClusterClient) talks to the API
//! server; tests substitute [`MockClusterClient`](crate::MockClusterClient).

use crate::error::ClusterError;
use crate::models::{ChildResource, ResourceKind};
use crds::NFDeployment;
use std::fmt::Debug;

/// Trait for the Kubernetes operations used during reconciliation
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync + Debug {
    /// Fetch an NFDeployment; `Ok(None)` when it does not exist
    async fn get_nf_deployment(&self, namespace: &str, name: &str) -> Result<Option<NFDeployment>, ClusterError>;

    /// Persist `status` of the given NFDeployment, guarded by its resourceVersion
    async fn update_nf_deployment_status(&self, intent: &NFDeployment) -> Result<NFDeployment, ClusterError>;

    /// Fetch a child resource; `Ok(None)` when it does not exist
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Option<ChildResource>, ClusterError>;

    /// Create a child resource. Fails with a conflict if it already exists.
    async fn create(&self, resource: &ChildResource) -> Result<ChildResource, ClusterError>;

    /// Replace a child resource. The resourceVersion in `resource` must be current.
    async fn update(&self, resource: &ChildResource) -> Result<ChildResource, ClusterError>;
}
