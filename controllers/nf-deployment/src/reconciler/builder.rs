//! Desired-state builder shared by every provider.
//!
//! A provider is pure data ([`ProviderDescriptor`]): image, ports, capacity
//! table and a config renderer. The functions here turn a descriptor plus an
//! intent into the ConfigMap, Deployment and Services that should exist.
//! Output depends only on the inputs, so rebuilding never produces drift.

use crate::error::ControllerError;
use crate::reconciler::params::{Capacity, Parameters};
use crds::NFDeployment;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource,
    ObjectFieldSelector, PodSpec, PodTemplateSpec, ResourceRequirements, SecurityContext, Service,
    ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Pod-template annotation carrying the ConfigMap fingerprint
pub const CONFIG_FINGERPRINT_ANNOTATION: &str = "sdcore.nephio.org/configmap-version";
/// Pod-template annotation recording the capacity tier the pods were sized for
pub const RESOURCES_ANNOTATION: &str = "sdcore.nephio.org/resources";
/// Multus network attachment annotation
pub const NETWORKS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/networks";
/// Value of the `app.kubernetes.io/managed-by` label on every child
pub const MANAGED_BY: &str = "nf-deployment-controller";

const CONFIG_VOLUME: &str = "config-volume";

/// Transport protocol of a container or Service port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Name as the Kubernetes API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Sctp => "SCTP",
        }
    }
}

/// Named port exposed by the container and its Service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub name: &'static str,
    /// Container port and Service port; they are always the same
    pub port: i32,
    pub protocol: Protocol,
}

/// Requests, limits and replica count for one capacity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTier {
    /// Quantities in the form the Deployment is built with, e.g. `500m`, `1Gi`
    pub cpu_request: &'static str,
    pub memory_request: &'static str,
    pub cpu_limit: &'static str,
    pub memory_limit: &'static str,
    pub replicas: i32,
}

/// One [`ResourceTier`] per capacity value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityTable {
    pub small: ResourceTier,
    pub medium: ResourceTier,
    pub large: ResourceTier,
}

impl ResourceTier {
    /// Canonical text form of the tier as built, e.g. `cpu=500m/1000m,memory=512Mi/1Gi,replicas=1`
    ///
    /// The API server rewrites quantities (`4000m` becomes `4`), so drift is
    /// detected on this annotation instead of on the container resources.
    pub fn summary(&self) -> String {
        format!(
            "cpu={}/{},memory={}/{},replicas={}",
            self.cpu_request, self.cpu_limit, self.memory_request, self.memory_limit, self.replicas
        )
    }
}

impl CapacityTable {
    /// Row selected by `capacity`
    pub fn tier(&self, capacity: Capacity) -> &ResourceTier {
        match capacity {
            Capacity::Small => &self.small,
            Capacity::Medium => &self.medium,
            Capacity::Large => &self.large,
        }
    }
}

/// Service created in addition to the primary one, named `<intent>-<suffix>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraService {
    pub suffix: &'static str,
    /// Built with `clusterIP: None`
    pub headless: bool,
    pub ports: &'static [PortSpec],
}

/// Source of a container environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvValue {
    Literal(&'static str),
    /// Downward API field path, e.g. `status.podIP`
    FieldRef(&'static str),
}

/// Container environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvSpec {
    pub name: &'static str,
    pub value: EnvValue,
}

/// Renders the ConfigMap `data` for a provider; fails on a malformed interface it reads
pub type RenderConfig = fn(&Parameters) -> Result<BTreeMap<String, String>, ControllerError>;

/// Everything that distinguishes one network function pipeline from another
#[derive(Debug)]
pub struct ProviderDescriptor {
    /// Fully qualified provider identifier, e.g. `upf.sdcore.io`
    pub id: &'static str,
    /// Short network function name, also used as container name
    pub name: &'static str,
    /// Name used in status messages, e.g. `UPF`
    pub display_name: &'static str,
    pub image: &'static str,
    pub command: &'static [&'static str],
    pub args: &'static [&'static str],
    /// Where the ConfigMap is mounted in the container
    pub config_mount_path: &'static str,
    /// File mode for the mounted config volume (scripts need the exec bit)
    pub config_mode: Option<i32>,
    /// Ports of the container and the primary Service
    pub ports: &'static [PortSpec],
    pub extra_services: &'static [ExtraService],
    pub capacity: CapacityTable,
    /// Linux capabilities added to the container
    pub capabilities: &'static [&'static str],
    /// Value for the network attachment annotation
    pub networks: Option<&'static str>,
    pub env: &'static [EnvSpec],
    /// Produces the ConfigMap `data`
    pub render_config: RenderConfig,
}

/// Desired child objects for one intent
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredResources {
    pub config_map: ConfigMap,
    pub deployment: Deployment,
    pub services: Vec<Service>,
}

struct Identity {
    name: String,
    namespace: String,
}

fn identity(intent: &NFDeployment) -> Result<Identity, ControllerError> {
    let name = intent
        .metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::InvalidParameter("NFDeployment has no name".to_string()))?;
    let namespace = intent.namespace().ok_or_else(|| {
        ControllerError::InvalidParameter(format!("NFDeployment {} has no namespace", name))
    })?;
    Ok(Identity { name, namespace })
}

/// Labels stamped on every child and on the pod template
pub fn labels(provider: &ProviderDescriptor, instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("name".to_string(), instance.to_string()),
        ("app.kubernetes.io/name".to_string(), provider.name.to_string()),
        ("app.kubernetes.io/instance".to_string(), instance.to_string()),
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
    ])
}

/// Pod selector shared by the Deployment and its Services
pub fn selector(instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("name".to_string(), instance.to_string())])
}

fn object_meta(provider: &ProviderDescriptor, id: &Identity, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(id.namespace.clone()),
        labels: Some(labels(provider, &id.name)),
        ..Default::default()
    }
}

/// Lowercase hex SHA-256 over the data map in key order
pub fn fingerprint(data: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Build the ConfigMap holding the rendered provider configuration
pub fn build_config_map(
    provider: &ProviderDescriptor,
    intent: &NFDeployment,
    params: &Parameters,
) -> Result<ConfigMap, ControllerError> {
    let id = identity(intent)?;
    Ok(ConfigMap {
        metadata: object_meta(provider, &id, id.name.clone()),
        data: Some((provider.render_config)(params)?),
        ..Default::default()
    })
}

fn resource_requirements(tier: &ResourceTier) -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(tier.cpu_request.to_string())),
            ("memory".to_string(), Quantity(tier.memory_request.to_string())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(tier.cpu_limit.to_string())),
            ("memory".to_string(), Quantity(tier.memory_limit.to_string())),
        ])),
        ..Default::default()
    }
}

fn env_vars(provider: &ProviderDescriptor) -> Option<Vec<EnvVar>> {
    if provider.env.is_empty() {
        return None;
    }
    let vars = provider
        .env
        .iter()
        .map(|spec| match spec.value {
            EnvValue::Literal(value) => EnvVar {
                name: spec.name.to_string(),
                value: Some(value.to_string()),
                ..Default::default()
            },
            EnvValue::FieldRef(path) => EnvVar {
                name: spec.name.to_string(),
                value_from: Some(EnvVarSource {
                    field_ref: Some(ObjectFieldSelector {
                        field_path: path.to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        })
        .collect();
    Some(vars)
}

fn string_list(items: &[&str]) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items.iter().map(|s| (*s).to_string()).collect())
    }
}

fn build_container(provider: &ProviderDescriptor, tier: &ResourceTier) -> Container {
    let security_context = (!provider.capabilities.is_empty()).then(|| SecurityContext {
        capabilities: Some(Capabilities {
            add: string_list(provider.capabilities),
            ..Default::default()
        }),
        ..Default::default()
    });

    Container {
        name: provider.name.to_string(),
        image: Some(provider.image.to_string()),
        command: string_list(provider.command),
        args: string_list(provider.args),
        ports: Some(
            provider
                .ports
                .iter()
                .map(|p| ContainerPort {
                    name: Some(p.name.to_string()),
                    container_port: p.port,
                    protocol: Some(p.protocol.as_str().to_string()),
                    ..Default::default()
                })
                .collect(),
        ),
        env: env_vars(provider),
        resources: Some(resource_requirements(tier)),
        security_context,
        volume_mounts: Some(vec![VolumeMount {
            name: CONFIG_VOLUME.to_string(),
            mount_path: provider.config_mount_path.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// Build the Deployment; `fingerprint` is the applied ConfigMap's fingerprint when known
pub fn build_deployment(
    provider: &ProviderDescriptor,
    intent: &NFDeployment,
    params: &Parameters,
    fingerprint: Option<&str>,
) -> Result<Deployment, ControllerError> {
    let id = identity(intent)?;
    let tier = provider.capacity.tier(params.capacity);

    let mut annotations = BTreeMap::from([(RESOURCES_ANNOTATION.to_string(), tier.summary())]);
    if let Some(networks) = provider.networks {
        annotations.insert(NETWORKS_ANNOTATION.to_string(), networks.to_string());
    }

    let pod_spec = PodSpec {
        containers: vec![build_container(provider, tier)],
        volumes: Some(vec![Volume {
            name: CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: id.name.clone(),
                default_mode: provider.config_mode,
                ..Default::default()
            }),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let mut deployment = Deployment {
        metadata: object_meta(provider, &id, id.name.clone()),
        spec: Some(DeploymentSpec {
            replicas: Some(tier.replicas),
            selector: LabelSelector {
                match_labels: Some(selector(&id.name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(provider, &id.name)),
                    annotations: Some(annotations),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        ..Default::default()
    };
    if let Some(fingerprint) = fingerprint {
        stamp_fingerprint(&mut deployment, fingerprint);
    }
    Ok(deployment)
}

/// Record the ConfigMap fingerprint on the pod template, so a config change rolls the pods
pub fn stamp_fingerprint(deployment: &mut Deployment, fingerprint: &str) {
    if let Some(spec) = deployment.spec.as_mut() {
        spec.template
            .metadata
            .get_or_insert_with(ObjectMeta::default)
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(CONFIG_FINGERPRINT_ANNOTATION.to_string(), fingerprint.to_string());
    }
}

fn service_ports(ports: &[PortSpec]) -> Vec<ServicePort> {
    ports
        .iter()
        .map(|p| ServicePort {
            name: Some(p.name.to_string()),
            port: p.port,
            target_port: Some(IntOrString::Int(p.port)),
            protocol: Some(p.protocol.as_str().to_string()),
            ..Default::default()
        })
        .collect()
}

/// Build the primary Service followed by any provider-specific extras
pub fn build_services(provider: &ProviderDescriptor, intent: &NFDeployment) -> Result<Vec<Service>, ControllerError> {
    let id = identity(intent)?;

    let mut services = vec![Service {
        metadata: object_meta(provider, &id, id.name.clone()),
        spec: Some(ServiceSpec {
            selector: Some(selector(&id.name)),
            ports: Some(service_ports(provider.ports)),
            ..Default::default()
        }),
        ..Default::default()
    }];

    for extra in provider.extra_services {
        services.push(Service {
            metadata: object_meta(provider, &id, format!("{}-{}", id.name, extra.suffix)),
            spec: Some(ServiceSpec {
                cluster_ip: extra.headless.then(|| "None".to_string()),
                selector: Some(selector(&id.name)),
                ports: Some(service_ports(extra.ports)),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    Ok(services)
}

/// Build the full desired graph in one go
pub fn build(
    provider: &ProviderDescriptor,
    intent: &NFDeployment,
    params: &Parameters,
    fingerprint: Option<&str>,
) -> Result<DesiredResources, ControllerError> {
    Ok(DesiredResources {
        config_map: build_config_map(provider, intent, params)?,
        deployment: build_deployment(provider, intent, params, fingerprint)?,
        services: build_services(provider, intent)?,
    })
}
