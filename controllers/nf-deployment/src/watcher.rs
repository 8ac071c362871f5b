//! Kubernetes resource watcher.
//!
//! Drives the reconciler from a `kube_runtime::Controller` on NFDeployment
//! that also owns ConfigMaps, Deployments and Services, so a change to any
//! managed child re-triggers its parent.

use crate::backoff::RetryBackoff;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crds::NFDeployment;
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile and error-policy call
#[derive(Debug)]
pub struct Context {
    pub reconciler: Reconciler,
    /// Shared with the probe server
    pub metrics: Arc<Metrics>,
    reconcile_timeout: Duration,
    /// Retry delays per `namespace/name`
    pub backoff: RetryBackoff,
}

impl Context {
    /// Bundle the reconciler with its metrics, attempt deadline and backoff bounds
    pub fn new(
        reconciler: Reconciler,
        metrics: Arc<Metrics>,
        reconcile_timeout: Duration,
        backoff_min_minutes: u64,
        backoff_max_minutes: u64,
    ) -> Self {
        Self {
            reconciler,
            metrics,
            reconcile_timeout,
            backoff: RetryBackoff::new(backoff_min_minutes, backoff_max_minutes),
        }
    }
}

fn object_key(obj: &NFDeployment) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}

/// Map a successful attempt onto the controller's next action
pub fn action_for(outcome: &ReconcileOutcome) -> Action {
    match outcome {
        ReconcileOutcome::Skipped(_) | ReconcileOutcome::Converged => Action::await_change(),
        ReconcileOutcome::RequeueAfter(delay) => Action::requeue(*delay),
    }
}

/// Run one bounded attempt for `obj` and record its outcome
pub async fn reconcile(obj: Arc<NFDeployment>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = object_key(&obj);
    let namespace = obj
        .namespace()
        .ok_or_else(|| ControllerError::InvalidParameter(format!("NFDeployment {} has no namespace", key)))?;
    let name = obj.name_any();

    let started = Instant::now();
    let deadline = started + ctx.reconcile_timeout;
    let result = ctx.reconciler.reconcile(&namespace, &name, deadline).await;
    let elapsed = started.elapsed();

    match result {
        Ok(outcome) => {
            ctx.metrics.observe(outcome.label(), elapsed);
            ctx.backoff.clear(&key);
            debug!("Reconciled NFDeployment {}: {} in {:?}", key, outcome, elapsed);
            Ok(action_for(&outcome))
        }
        Err(e) => {
            ctx.metrics.observe_error(e.metric_label(), elapsed);
            Err(e)
        }
    }
}

/// Requeue a failed intent after its next backoff delay
pub fn error_policy(obj: Arc<NFDeployment>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = object_key(&obj);
    let delay = ctx.backoff.next_delay(&key);
    if error.is_retriable() {
        warn!("Reconcile of NFDeployment {} failed, retrying in {:?}: {}", key, delay, error);
    } else {
        error!(
            "Reconcile of NFDeployment {} failed and needs a spec change, rechecking in {:?}: {}",
            key, delay, error
        );
    }
    Action::requeue(delay)
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the controller until a shutdown signal arrives
pub async fn watch_nf_deployments(
    client: Client,
    namespace: Option<&str>,
    concurrency: u16,
    ctx: Arc<Context>,
) -> Result<(), ControllerError> {
    info!(
        "Starting NFDeployment watcher (namespace: {}, concurrency: {})",
        namespace.unwrap_or("all namespaces"),
        concurrency
    );

    let config = RuntimeConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(concurrency);

    Controller::new(scoped_api::<NFDeployment>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<ConfigMap>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Deployment>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Service>(&client, namespace), watcher::Config::default())
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {}/{}", obj.namespace.unwrap_or_default(), obj.name),
                Err(e) => debug!("Controller event: {}", e),
            }
        })
        .await;

    info!("NFDeployment watcher stopped");
    Ok(())
}
