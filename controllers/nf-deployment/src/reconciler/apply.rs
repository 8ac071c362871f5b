//! Applier: get-or-create, then update only on drift.

use crate::error::ControllerError;
use crate::reconciler::drift;
use cluster_client::{ChildResource, ClusterClientTrait, ClusterError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info};

/// Outcome of applying one desired child
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// A create or update was issued
    pub changed: bool,
    /// The object as the API server now has it
    pub applied: ChildResource,
}

/// Run a store call under the attempt deadline
pub(crate) async fn bounded<T, F>(
    deadline: Instant,
    operation: impl FnOnce() -> String,
    call: F,
) -> Result<Result<T, ClusterError>, ControllerError>
where
    F: Future<Output = Result<T, ClusterError>>,
{
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|elapsed| ControllerError::DeadlineExceeded(format!("{} ({})", operation(), elapsed)))
}

/// Record `owner` as the controller of `meta`
///
/// Fails if a different object already controls it; Kubernetes allows one controller.
pub fn set_controller_owner(meta: &mut ObjectMeta, owner: &OwnerReference) -> Result<(), ControllerError> {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(ControllerError::OwnerReferenceFailed(format!(
            "{} is already controlled by {} {}",
            meta.name.as_deref().unwrap_or_default(),
            other.kind,
            other.name
        )));
    }
    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner.clone());
    Ok(())
}

/// Existing object with the desired body and labels laid over it
fn merge_for_update(
    existing: &ChildResource,
    desired: &ChildResource,
    owner: &OwnerReference,
) -> Result<ChildResource, ControllerError> {
    let mut merged = existing.clone();

    let meta = merged.metadata_mut();
    if let Some(desired_labels) = desired.metadata().labels.as_ref() {
        meta.labels
            .get_or_insert_with(BTreeMap::new)
            .extend(desired_labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    set_controller_owner(meta, owner)?;

    match (&mut merged, desired) {
        (ChildResource::ConfigMap(m), ChildResource::ConfigMap(d)) => {
            m.data = d.data.clone();
        }
        (ChildResource::Deployment(m), ChildResource::Deployment(d)) => {
            m.spec = d.spec.clone();
        }
        (ChildResource::Service(m), ChildResource::Service(d)) => {
            let mut spec = d.spec.clone().unwrap_or_default();
            // clusterIP is immutable once assigned
            if let Some(old) = m.spec.take().filter(|s| s.cluster_ip.is_some()) {
                spec.cluster_ip = old.cluster_ip;
                spec.cluster_ips = old.cluster_ips;
            }
            m.spec = Some(spec);
        }
        (existing, desired) => {
            return Err(ControllerError::ResourceApplyFailed {
                kind: desired.kind(),
                name: desired.name().to_string(),
                source: ClusterError::InvalidRequest(format!(
                    "cannot replace {} with {}",
                    existing.kind(),
                    desired.kind()
                )),
            });
        }
    }

    Ok(merged)
}

/// Bring one child in line with `desired`
///
/// Absent: created with the owner reference. Present and in sync: left
/// alone. Otherwise the existing object is updated in place, carrying its
/// resourceVersion so a racing writer causes a conflict.
pub async fn apply(
    client: &dyn ClusterClientTrait,
    mut desired: ChildResource,
    owner: &OwnerReference,
    deadline: Instant,
) -> Result<ApplyResult, ControllerError> {
    let kind = desired.kind();
    let namespace = desired.namespace().to_string();
    let name = desired.name().to_string();
    let apply_failed = |source: ClusterError| ControllerError::ResourceApplyFailed {
        kind,
        name: format!("{}/{}", namespace, name),
        source,
    };

    let existing = bounded(
        deadline,
        || format!("get {} {}/{}", kind, namespace, name),
        client.get(kind, &namespace, &name),
    )
    .await?
    .map_err(&apply_failed)?;

    let Some(existing) = existing else {
        set_controller_owner(desired.metadata_mut(), owner)?;
        info!("Creating {} {}/{}", kind, namespace, name);
        let created = bounded(
            deadline,
            || format!("create {} {}/{}", kind, namespace, name),
            client.create(&desired),
        )
        .await?
        .map_err(&apply_failed)?;
        return Ok(ApplyResult {
            changed: true,
            applied: created,
        });
    };

    if drift::in_sync(&existing, &desired, &owner.uid) {
        debug!("{} {}/{} is up to date", kind, namespace, name);
        return Ok(ApplyResult {
            changed: false,
            applied: existing,
        });
    }

    let merged = merge_for_update(&existing, &desired, owner)?;
    info!("Updating {} {}/{}", kind, namespace, name);
    let updated = bounded(
        deadline,
        || format!("update {} {}/{}", kind, namespace, name),
        client.update(&merged),
    )
    .await?
    .map_err(&apply_failed)?;

    Ok(ApplyResult {
        changed: true,
        applied: updated,
    })
}
