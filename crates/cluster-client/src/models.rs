//! Child resource models
//!
//! The reconciler manages three kinds of namespaced children. [`ChildResource`]
//! carries any of them through the client trait without erasing the type.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;

/// Kinds of child resources owned by an NFDeployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ConfigMap,
    Deployment,
    Service,
}

impl ResourceKind {
    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed child resource
#[derive(Debug, Clone, PartialEq)]
pub enum ChildResource {
    ConfigMap(ConfigMap),
    Deployment(Deployment),
    Service(Service),
}

impl ChildResource {
    /// Kind of the wrapped object
    pub fn kind(&self) -> ResourceKind {
        match self {
            ChildResource::ConfigMap(_) => ResourceKind::ConfigMap,
            ChildResource::Deployment(_) => ResourceKind::Deployment,
            ChildResource::Service(_) => ResourceKind::Service,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ChildResource::ConfigMap(cm) => &cm.metadata,
            ChildResource::Deployment(d) => &d.metadata,
            ChildResource::Service(s) => &s.metadata,
        }
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildResource::ConfigMap(cm) => &mut cm.metadata,
            ChildResource::Deployment(d) => &mut d.metadata,
            ChildResource::Service(s) => &mut s.metadata,
        }
    }

    /// Object name, empty when unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Object namespace, empty when unset
    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    /// Resource version for optimistic concurrency
    pub fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }

    /// Wrapped Deployment, if any
    pub fn as_deployment(&self) -> Option<&Deployment> {
        match self {
            ChildResource::Deployment(d) => Some(d),
            _ => None,
        }
    }

    /// Wrapped Service, if any
    pub fn as_service(&self) -> Option<&Service> {
        match self {
            ChildResource::Service(s) => Some(s),
            _ => None,
        }
    }

    /// Wrapped ConfigMap, if any
    pub fn as_config_map(&self) -> Option<&ConfigMap> {
        match self {
            ChildResource::ConfigMap(cm) => Some(cm),
            _ => None,
        }
    }
}

impl From<ConfigMap> for ChildResource {
    fn from(cm: ConfigMap) -> Self {
        ChildResource::ConfigMap(cm)
    }
}

impl From<Deployment> for ChildResource {
    fn from(d: Deployment) -> Self {
        ChildResource::Deployment(d)
    }
}

impl From<Service> for ChildResource {
    fn from(s: Service) -> Self {
        ChildResource::Service(s)
    }
}
