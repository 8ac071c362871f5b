//! Drift comparison between an existing child and its freshly built desired form.
//!
//! Only fields the controller owns are compared. Anything the API server
//! defaults or canonicalises (resource quantities, `targetPort`, `clusterIP`,
//! status) is ignored, so an unchanged intent never produces an update.
//! Capacity changes are caught through the tier annotation on the pod template.

use crate::reconciler::builder::{CONFIG_FINGERPRINT_ANNOTATION, RESOURCES_ANNOTATION};
use cluster_client::ChildResource;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// True when `meta` carries a controller owner reference to `owner_uid`
pub fn has_controller_owner(meta: &ObjectMeta, owner_uid: &str) -> bool {
    meta.owner_references
        .iter()
        .flatten()
        .any(|r| r.uid == owner_uid && r.controller == Some(true))
}

/// Full `data` map equality
pub fn config_map_equal(existing: &ConfigMap, desired: &ConfigMap) -> bool {
    let empty = BTreeMap::new();
    existing.data.as_ref().unwrap_or(&empty) == desired.data.as_ref().unwrap_or(&empty)
}

fn images(deployment: &Deployment) -> Vec<Option<&str>> {
    deployment
        .spec
        .iter()
        .filter_map(|s| s.template.spec.as_ref())
        .flat_map(|pod| pod.containers.iter())
        .map(|c| c.image.as_deref())
        .collect()
}

fn template_annotation<'a>(deployment: &'a Deployment, key: &str) -> Option<&'a str> {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.metadata.as_ref())
        .and_then(|m| m.annotations.as_ref())
        .and_then(|a| a.get(key))
        .map(String::as_str)
}

fn replicas(deployment: &Deployment) -> i32 {
    deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1)
}

/// Images (in container order), config fingerprint, capacity tier and replica count
pub fn deployment_equal(existing: &Deployment, desired: &Deployment) -> bool {
    images(existing) == images(desired)
        && template_annotation(existing, CONFIG_FINGERPRINT_ANNOTATION)
            == template_annotation(desired, CONFIG_FINGERPRINT_ANNOTATION)
        && template_annotation(existing, RESOURCES_ANNOTATION) == template_annotation(desired, RESOURCES_ANNOTATION)
        && replicas(existing) == replicas(desired)
}

fn port_set(service: &Service) -> Vec<(String, i32, String)> {
    let mut ports: Vec<(String, i32, String)> = service
        .spec
        .iter()
        .flat_map(|s| s.ports.iter().flatten())
        .map(|p| {
            (
                p.name.clone().unwrap_or_default(),
                p.port,
                p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
            )
        })
        .collect();
    ports.sort();
    ports
}

fn service_selector(service: &Service) -> BTreeMap<String, String> {
    service
        .spec
        .as_ref()
        .and_then(|s| s.selector.clone())
        .unwrap_or_default()
}

/// Port (name, port, protocol) multiset and selector
pub fn service_equal(existing: &Service, desired: &Service) -> bool {
    port_set(existing) == port_set(desired) && service_selector(existing) == service_selector(desired)
}

/// Kind-aware semantic equality; children of different kinds are never equal
pub fn equal(existing: &ChildResource, desired: &ChildResource) -> bool {
    match (existing, desired) {
        (ChildResource::ConfigMap(a), ChildResource::ConfigMap(b)) => config_map_equal(a, b),
        (ChildResource::Deployment(a), ChildResource::Deployment(b)) => deployment_equal(a, b),
        (ChildResource::Service(a), ChildResource::Service(b)) => service_equal(a, b),
        _ => false,
    }
}

/// No update needed: bodies match and the owner reference is in place
pub fn in_sync(existing: &ChildResource, desired: &ChildResource, owner_uid: &str) -> bool {
    equal(existing, desired) && has_controller_owner(existing.metadata(), owner_uid)
}
