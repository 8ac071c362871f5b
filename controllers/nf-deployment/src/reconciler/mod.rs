//! NFDeployment reconciler
//!
//! One attempt is a sequential pipeline: fetch the intent, pick its provider,
//! extract parameters, apply ConfigMap, Deployment and Services, then project
//! the Deployment's state onto the intent status.

pub mod apply;
pub mod builder;
pub mod drift;
pub mod params;
pub mod providers;
pub mod status;

#[cfg(test)]
mod builder_test;
#[cfg(test)]
mod reconcile_test;

use crate::error::ControllerError;
use crate::reconciler::apply::{apply, bounded};
use crate::reconciler::providers::ProviderRegistry;
use crate::reconciler::status::WorkloadState;
use chrono::Utc;
use cluster_client::{ChildResource, ClusterClientTrait};
use crds::NFDeployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Why an attempt ended without doing anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The intent no longer exists
    NotFound,
    /// The provider belongs to no registered pipeline
    UnknownProvider(String),
}

/// Terminal state of a successful attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to do for this intent; wait for the next watch event
    Skipped(SkipReason),
    /// Nothing changed; wait for the next watch event
    Converged,
    /// A child was created or updated; check again after the delay
    RequeueAfter(Duration),
}

impl ReconcileOutcome {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Skipped(_) => "skipped",
            ReconcileOutcome::Converged => "converged",
            ReconcileOutcome::RequeueAfter(_) => "requeued",
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Skipped(SkipReason::NotFound) => write!(f, "skipped (not found)"),
            ReconcileOutcome::Skipped(SkipReason::UnknownProvider(p)) => {
                write!(f, "skipped (unknown provider {})", p)
            }
            ReconcileOutcome::Converged => write!(f, "converged"),
            ReconcileOutcome::RequeueAfter(d) => write!(f, "requeue after {:?}", d),
        }
    }
}

/// Runs reconcile attempts against a cluster client
#[derive(Debug)]
pub struct Reconciler {
    client: Box<dyn ClusterClientTrait>,
    providers: ProviderRegistry,
    requeue_after: Duration,
}

impl Reconciler {
    /// `requeue_after` is the delay returned when an attempt changed a child
    pub fn new(client: Box<dyn ClusterClientTrait>, providers: ProviderRegistry, requeue_after: Duration) -> Self {
        Self {
            client,
            providers,
            requeue_after,
        }
    }

    /// Run one attempt for `namespace/name`, aborting at `deadline`
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
        deadline: Instant,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let key = format!("{}/{}", namespace, name);

        let intent = bounded(
            deadline,
            || format!("get NFDeployment {}", key),
            self.client.get_nf_deployment(namespace, name),
        )
        .await?
        .map_err(|source| ControllerError::IntentFetchFailed {
            name: key.clone(),
            source,
        })?;
        let Some(mut intent) = intent else {
            debug!("NFDeployment {} not found, skipping", key);
            return Ok(ReconcileOutcome::Skipped(SkipReason::NotFound));
        };

        let Some(provider) = self.providers.lookup(&intent.spec.provider) else {
            info!(
                "NFDeployment {} has provider {} which is not handled here, skipping",
                key, intent.spec.provider
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownProvider(
                intent.spec.provider.clone(),
            )));
        };
        info!("Reconciling NFDeployment {} (provider: {})", key, provider.id);

        let params = params::extract(&intent.spec)?;
        let owner = owner_reference(&intent)?;

        // Build the whole graph before the first write so bad input mutates nothing
        let desired = builder::build(provider, &intent, &params, None)?;

        let mut changed = false;

        let config_map = apply(self.client.as_ref(), desired.config_map.into(), &owner, deadline).await?;
        changed |= config_map.changed;
        let fingerprint = config_map
            .applied
            .as_config_map()
            .and_then(|cm| cm.data.as_ref())
            .map(builder::fingerprint)
            .unwrap_or_default();
        debug!("ConfigMap fingerprint for {}: {}", key, fingerprint);

        let mut deployment = desired.deployment;
        builder::stamp_fingerprint(&mut deployment, &fingerprint);
        let deployment = apply(self.client.as_ref(), deployment.into(), &owner, deadline).await?;
        changed |= deployment.changed;

        for service in desired.services {
            let service = apply(self.client.as_ref(), ChildResource::from(service), &owner, deadline).await?;
            changed |= service.changed;
        }

        let workload = deployment
            .applied
            .as_deployment()
            .map(WorkloadState::from_deployment)
            .unwrap_or_default();
        let (new_status, status_changed) =
            status::project(intent.status.as_ref(), &workload, provider.display_name, Utc::now());
        if status_changed {
            intent.status = Some(new_status);
            bounded(
                deadline,
                || format!("update status of NFDeployment {}", key),
                self.client.update_nf_deployment_status(&intent),
            )
            .await?
            .map_err(|source| ControllerError::StatusUpdateFailed {
                name: key.clone(),
                source,
            })?;
            info!(
                "Updated status of NFDeployment {} (ready replicas: {}/{})",
                key, workload.ready_replicas, workload.desired_replicas
            );
        }

        if changed {
            Ok(ReconcileOutcome::RequeueAfter(self.requeue_after))
        } else {
            Ok(ReconcileOutcome::Converged)
        }
    }
}

fn owner_reference(intent: &NFDeployment) -> Result<OwnerReference, ControllerError> {
    intent.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::OwnerReferenceFailed(format!(
            "NFDeployment {} has no uid",
            intent.metadata.name.as_deref().unwrap_or_default()
        ))
    })
}
