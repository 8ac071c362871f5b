//! kube-backed implementation of [`ClusterClientTrait`]

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::models::{ChildResource, ResourceKind};
use crds::NFDeployment;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{self, Debug};
use tracing::debug;

/// Cluster client backed by a live `kube::Client`
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl Debug for KubeClusterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Wrap an already configured kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_typed<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create_typed<K>(&self, obj: &K) -> Result<K, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Serialize + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = required_namespace(obj.meta())?;
        self.api::<K>(namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(ClusterError::from_write)
    }

    async fn replace_typed<K>(&self, obj: &K) -> Result<K, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Serialize + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = required_namespace(obj.meta())?;
        let name = required_name(obj.meta())?;
        self.api::<K>(namespace)
            .replace(name, &PostParams::default(), obj)
            .await
            .map_err(ClusterError::from_write)
    }
}

fn required_name(meta: &ObjectMeta) -> Result<&str, ClusterError> {
    meta.name
        .as_deref()
        .ok_or_else(|| ClusterError::InvalidRequest("metadata.name is required".to_string()))
}

fn required_namespace(meta: &ObjectMeta) -> Result<&str, ClusterError> {
    meta.namespace
        .as_deref()
        .ok_or_else(|| ClusterError::InvalidRequest("metadata.namespace is required".to_string()))
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_nf_deployment(&self, namespace: &str, name: &str) -> Result<Option<NFDeployment>, ClusterError> {
        self.get_typed::<NFDeployment>(namespace, name).await
    }

    async fn update_nf_deployment_status(&self, intent: &NFDeployment) -> Result<NFDeployment, ClusterError> {
        let namespace = required_namespace(&intent.metadata)?;
        let name = required_name(&intent.metadata)?;

        // resourceVersion in a merge patch makes the write conditional
        let patch = serde_json::json!({
            "apiVersion": "workload.nephio.org/v1alpha1",
            "kind": "NFDeployment",
            "metadata": { "resourceVersion": intent.metadata.resource_version },
            "status": intent.status,
        });

        debug!("Patching status of NFDeployment {}/{}", namespace, name);
        self.api::<NFDeployment>(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(ClusterError::from_write)
    }

    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Option<ChildResource>, ClusterError> {
        let found = match kind {
            ResourceKind::ConfigMap => self.get_typed::<ConfigMap>(namespace, name).await?.map(ChildResource::from),
            ResourceKind::Deployment => self.get_typed::<Deployment>(namespace, name).await?.map(ChildResource::from),
            ResourceKind::Service => self.get_typed::<Service>(namespace, name).await?.map(ChildResource::from),
        };
        Ok(found)
    }

    async fn create(&self, resource: &ChildResource) -> Result<ChildResource, ClusterError> {
        debug!("Creating {} {}/{}", resource.kind(), resource.namespace(), resource.name());
        let created = match resource {
            ChildResource::ConfigMap(cm) => self.create_typed(cm).await?.into(),
            ChildResource::Deployment(d) => self.create_typed(d).await?.into(),
            ChildResource::Service(s) => self.create_typed(s).await?.into(),
        };
        Ok(created)
    }

    async fn update(&self, resource: &ChildResource) -> Result<ChildResource, ClusterError> {
        debug!("Replacing {} {}/{}", resource.kind(), resource.namespace(), resource.name());
        let updated = match resource {
            ChildResource::ConfigMap(cm) => self.replace_typed(cm).await?.into(),
            ChildResource::Deployment(d) => self.replace_typed(d).await?.into(),
            ChildResource::Service(s) => self.replace_typed(s).await?.into(),
        };
        Ok(updated)
    }
}
