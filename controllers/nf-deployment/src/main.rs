//! NFDeployment Controller
//!
//! Renders SD-Core network functions (UPF, AMF, SMF, NRF, NSSF, NEF) from
//! NFDeployment intents into ConfigMaps, Deployments and Services, and keeps
//! them converged.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod probes;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Process-wide crypto provider for kube's rustls client
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting NFDeployment Controller");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Concurrency: {}", config.concurrency);
    info!("  Requeue after: {:?}", config.requeue_after);
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!(
        "  Backoff: {}m..{}m",
        config.backoff_min_minutes, config.backoff_max_minutes
    );
    info!("  Probe address: {}", config.probe_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
