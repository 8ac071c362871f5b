//! Main controller implementation.
//!
//! Wires the Kubernetes client, provider registry, metrics and probe server
//! together and runs the NFDeployment watcher until shutdown.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::probes::{self, ProbeState};
use crate::reconciler::Reconciler;
use crate::reconciler::providers::ProviderRegistry;
use crate::watcher::{self, Context};
use cluster_client::KubeClusterClient;
use crds::NFDeployment;
use kube::api::ListParams;
use kube::{Api, Client};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// Main controller for NFDeployment management.
pub struct Controller {
    client: Client,
    config: ControllerConfig,
    context: Arc<Context>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing NFDeployment Controller");

        let client = Client::try_default().await?;

        let providers = ProviderRegistry::sdcore()?;
        if providers.is_empty() {
            return Err(ControllerError::InvalidConfig("no providers registered".to_string()));
        }
        info!("Registered {} provider keys: {}", providers.len(), providers.keys().join(", "));

        let metrics = Metrics::new()
            .map_err(|e| ControllerError::InvalidConfig(format!("Failed to register metrics: {}", e)))?;

        let reconciler = Reconciler::new(
            Box::new(KubeClusterClient::new(client.clone())),
            providers,
            config.requeue_after,
        );
        let context = Arc::new(Context::new(
            reconciler,
            Arc::new(metrics),
            config.reconcile_timeout,
            config.backoff_min_minutes,
            config.backoff_max_minutes,
        ));

        Ok(Self {
            client,
            config,
            context,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        let namespace = self.config.namespace.as_deref();

        // Fail fast when the CRD is not installed
        let api: Api<NFDeployment> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        api.list(&ListParams::default().limit(1)).await.map_err(|e| {
            ControllerError::Watch(format!(
                "NFDeployment CRD is not available, install it first: {}",
                e
            ))
        })?;
        info!("NFDeployment CRD is available");

        let probe_state = ProbeState::new(self.context.metrics.clone());
        let probe_server = tokio::spawn(probes::serve(self.config.probe_addr, probe_state.clone()));

        probe_state.ready.store(true, Ordering::Relaxed);
        info!("NFDeployment Controller running");

        let result = tokio::select! {
            result = watcher::watch_nf_deployments(
                self.client.clone(),
                namespace,
                self.config.concurrency,
                self.context.clone(),
            ) => result,
            result = probe_server => {
                let err = match result {
                    Ok(Ok(())) => ControllerError::Watch("Probe server exited".to_string()),
                    Ok(Err(e)) => e,
                    Err(e) => ControllerError::Watch(format!("Probe server panicked: {}", e)),
                };
                error!("{}", err);
                Err(err)
            }
        };

        probe_state.ready.store(false, Ordering::Relaxed);
        result
    }
}
