//! Mock ClusterClient for unit testing
//!
//! Stores NFDeployments and child resources in memory and imitates the API
//! server behaviour the reconciler depends on: resourceVersion bumps with
//! optimistic-concurrency conflicts, Deployment generation tracking and
//! ClusterIP assignment for Services. Call counters and failure injection let
//! tests assert on the exact writes a reconcile performs.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::models::{ChildResource, ResourceKind};
use crds::{NFDeployment, NFDeploymentStatus};
use k8s_openapi::api::apps::v1::DeploymentStatus;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type ObjectKey = (ResourceKind, String, String);

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// Fetching the NFDeployment itself
    GetIntent,
    /// Persisting NFDeployment status
    UpdateStatus,
    Get(ResourceKind),
    Create(ResourceKind),
    Update(ResourceKind),
}

/// Mock ClusterClient for testing
#[derive(Debug, Clone, Default)]
pub struct MockClusterClient {
    pub(crate) intents: Arc<Mutex<HashMap<(String, String), NFDeployment>>>,
    pub(crate) objects: Arc<Mutex<HashMap<ObjectKey, ChildResource>>>,
    pub(crate) creates: Arc<Mutex<HashMap<ResourceKind, usize>>>,
    pub(crate) updates: Arc<Mutex<HashMap<ResourceKind, usize>>>,
    pub(crate) status_updates: Arc<Mutex<usize>>,
    pub(crate) failures: Arc<Mutex<HashSet<MockOperation>>>,
    pub(crate) latency: Arc<Mutex<Option<Duration>>>,
    // Shared counter for resourceVersion, uid and ClusterIP generation
    pub(crate) next_id: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockClusterClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        *id += 1;
        *id
    }

    async fn simulate(&self, op: MockOperation) -> Result<(), ClusterError> {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if lock(&self.failures).contains(&op) {
            return Err(ClusterError::InvalidRequest(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }

    /// Store an NFDeployment, filling in uid, generation and resourceVersion when absent
    pub fn insert_nf_deployment(&self, mut intent: NFDeployment) -> NFDeployment {
        let id = self.next_id();
        let meta = &mut intent.metadata;
        meta.uid.get_or_insert_with(|| format!("uid-{}", id));
        meta.generation.get_or_insert(1);
        meta.resource_version = Some(id.to_string());
        let key = (
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        );
        lock(&self.intents).insert(key, intent.clone());
        intent
    }

    /// Current stored copy of an NFDeployment
    pub fn nf_deployment(&self, namespace: &str, name: &str) -> Option<NFDeployment> {
        lock(&self.intents)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Store a child resource directly, bypassing counters
    pub fn insert_object(&self, mut resource: ChildResource) -> ChildResource {
        let id = self.next_id();
        resource.metadata_mut().resource_version = Some(id.to_string());
        let key = object_key(&resource);
        lock(&self.objects).insert(key, resource.clone());
        resource
    }

    /// Current stored copy of a child resource
    pub fn object(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<ChildResource> {
        lock(&self.objects)
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored child resources of `kind`
    pub fn object_count(&self, kind: ResourceKind) -> usize {
        lock(&self.objects).keys().filter(|(k, _, _)| *k == kind).count()
    }

    /// Pretend the Deployment controller observed the workload and reports `ready_replicas`
    pub fn set_deployment_ready(&self, namespace: &str, name: &str, ready_replicas: i32) -> bool {
        let id = self.next_id();
        let mut objects = lock(&self.objects);
        let key = (ResourceKind::Deployment, namespace.to_string(), name.to_string());
        let Some(ChildResource::Deployment(deployment)) = objects.get_mut(&key) else {
            return false;
        };
        let status = deployment.status.get_or_insert_with(DeploymentStatus::default);
        status.ready_replicas = Some(ready_replicas);
        status.observed_generation = deployment.metadata.generation;
        deployment.metadata.resource_version = Some(id.to_string());
        true
    }

    /// Make every subsequent call of `op` fail
    pub fn fail_on(&self, op: MockOperation) {
        lock(&self.failures).insert(op);
    }

    /// Stop failing `op`
    pub fn clear_failure(&self, op: MockOperation) {
        lock(&self.failures).remove(&op);
    }

    /// Delay every call by `latency` (tokio time, so paused clocks apply)
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    /// Successful creates of `kind` since the last reset
    pub fn create_count(&self, kind: ResourceKind) -> usize {
        lock(&self.creates).get(&kind).copied().unwrap_or(0)
    }

    /// Successful updates of `kind` since the last reset
    pub fn update_count(&self, kind: ResourceKind) -> usize {
        lock(&self.updates).get(&kind).copied().unwrap_or(0)
    }

    /// Successful status writes since the last reset
    pub fn status_update_count(&self) -> usize {
        *lock(&self.status_updates)
    }

    /// Creates plus updates across all kinds, status writes excluded
    pub fn total_writes(&self) -> usize {
        lock(&self.creates).values().sum::<usize>() + lock(&self.updates).values().sum::<usize>()
    }

    /// Reset call counters, keeping stored objects
    pub fn reset_counters(&self) {
        lock(&self.creates).clear();
        lock(&self.updates).clear();
        *lock(&self.status_updates) = 0;
    }
}

fn object_key(resource: &ChildResource) -> ObjectKey {
    (
        resource.kind(),
        resource.namespace().to_string(),
        resource.name().to_string(),
    )
}

fn check_version(incoming: Option<&str>, stored: Option<&str>, what: &str) -> Result<(), ClusterError> {
    match incoming {
        Some(v) if Some(v) != stored => Err(ClusterError::Conflict(format!(
            "{} has been modified; resourceVersion {} is stale",
            what, v
        ))),
        _ => Ok(()),
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_nf_deployment(&self, namespace: &str, name: &str) -> Result<Option<NFDeployment>, ClusterError> {
        self.simulate(MockOperation::GetIntent).await?;
        Ok(self.nf_deployment(namespace, name))
    }

    async fn update_nf_deployment_status(&self, intent: &NFDeployment) -> Result<NFDeployment, ClusterError> {
        self.simulate(MockOperation::UpdateStatus).await?;
        let id = self.next_id();
        let namespace = intent.metadata.namespace.clone().unwrap_or_default();
        let name = intent.metadata.name.clone().unwrap_or_default();

        let mut intents = lock(&self.intents);
        let stored = intents
            .get_mut(&(namespace.clone(), name.clone()))
            .ok_or_else(|| ClusterError::NotFound(format!("NFDeployment {}/{}", namespace, name)))?;
        check_version(
            intent.metadata.resource_version.as_deref(),
            stored.metadata.resource_version.as_deref(),
            &format!("NFDeployment {}/{}", namespace, name),
        )?;

        stored.status = Some(intent.status.clone().unwrap_or_else(NFDeploymentStatus::default));
        stored.metadata.resource_version = Some(id.to_string());
        *lock(&self.status_updates) += 1;
        Ok(stored.clone())
    }

    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Option<ChildResource>, ClusterError> {
        self.simulate(MockOperation::Get(kind)).await?;
        Ok(self.object(kind, namespace, name))
    }

    async fn create(&self, resource: &ChildResource) -> Result<ChildResource, ClusterError> {
        let kind = resource.kind();
        self.simulate(MockOperation::Create(kind)).await?;
        if resource.name().is_empty() || resource.namespace().is_empty() {
            return Err(ClusterError::InvalidRequest(format!("{} requires name and namespace", kind)));
        }
        let id = self.next_id();
        let key = object_key(resource);

        let mut objects = lock(&self.objects);
        if objects.contains_key(&key) {
            return Err(ClusterError::Conflict(format!(
                "{} {}/{} already exists",
                kind, key.1, key.2
            )));
        }

        let mut created = resource.clone();
        let meta = created.metadata_mut();
        meta.resource_version = Some(id.to_string());
        meta.uid = Some(format!("uid-{}", id));
        match &mut created {
            ChildResource::Deployment(d) => {
                d.metadata.generation = Some(1);
                d.status = None;
            }
            ChildResource::Service(s) => {
                if let Some(spec) = s.spec.as_mut() {
                    if spec.cluster_ip.is_none() {
                        let ip = format!("10.96.{}.{}", (id / 250) % 250, id % 250 + 1);
                        spec.cluster_ip = Some(ip.clone());
                        spec.cluster_ips = Some(vec![ip]);
                    }
                }
            }
            ChildResource::ConfigMap(_) => {}
        }

        objects.insert(key, created.clone());
        *lock(&self.creates).entry(kind).or_insert(0) += 1;
        Ok(created)
    }

    async fn update(&self, resource: &ChildResource) -> Result<ChildResource, ClusterError> {
        let kind = resource.kind();
        self.simulate(MockOperation::Update(kind)).await?;
        let id = self.next_id();
        let key = object_key(resource);

        let mut objects = lock(&self.objects);
        let stored = objects
            .get(&key)
            .ok_or_else(|| ClusterError::NotFound(format!("{} {}/{}", kind, key.1, key.2)))?;
        check_version(
            resource.resource_version(),
            stored.resource_version(),
            &format!("{} {}/{}", kind, key.1, key.2),
        )?;

        let mut updated = resource.clone();
        match (&mut updated, stored) {
            (ChildResource::Deployment(new), ChildResource::Deployment(old)) => {
                let generation = old.metadata.generation.unwrap_or(1);
                new.metadata.generation = Some(if new.spec != old.spec { generation + 1 } else { generation });
                new.status = old.status.clone();
            }
            (ChildResource::Service(new), ChildResource::Service(old)) => {
                let old_spec = old.spec.as_ref();
                if let Some(spec) = new.spec.as_mut() {
                    if spec.cluster_ip.is_none() {
                        spec.cluster_ip = old_spec.and_then(|s| s.cluster_ip.clone());
                        spec.cluster_ips = old_spec.and_then(|s| s.cluster_ips.clone());
                    }
                }
            }
            _ => {}
        }
        let meta = updated.metadata_mut();
        meta.resource_version = Some(id.to_string());
        if meta.uid.is_none() {
            meta.uid = stored.metadata().uid.clone();
        }

        objects.insert(key, updated.clone());
        *lock(&self.updates).entry(kind).or_insert(0) += 1;
        Ok(updated)
    }
}
