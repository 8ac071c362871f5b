//! Controller configuration read from environment variables at start-up.

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for the NFDeployment controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Attempts running at once, each for a different intent
    pub concurrency: u16,
    /// Delay before rechecking an intent whose children were just changed
    pub requeue_after: Duration,
    /// Deadline for one reconcile attempt
    pub reconcile_timeout: Duration,
    /// Error-policy backoff bounds
    pub backoff_min_minutes: u64,
    pub backoff_max_minutes: u64,
    /// Listener for health, readiness and metrics
    pub probe_addr: SocketAddr,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: 4,
            requeue_after: Duration::from_secs(10),
            reconcile_timeout: Duration::from_secs(30),
            backoff_min_minutes: 1,
            backoff_max_minutes: 10,
            probe_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let concurrency = parse_or(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        let requeue_after = Duration::from_secs(parse_or(
            &lookup,
            "REQUEUE_AFTER_SECS",
            defaults.requeue_after.as_secs(),
        )?);
        let reconcile_timeout = Duration::from_secs(parse_or(
            &lookup,
            "RECONCILE_TIMEOUT_SECS",
            defaults.reconcile_timeout.as_secs(),
        )?);
        if reconcile_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        let backoff_min_minutes = parse_or(&lookup, "BACKOFF_MIN_MINUTES", defaults.backoff_min_minutes)?;
        let backoff_max_minutes = parse_or(&lookup, "BACKOFF_MAX_MINUTES", defaults.backoff_max_minutes)?;
        if backoff_min_minutes == 0 || backoff_min_minutes > backoff_max_minutes {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff bounds must satisfy 0 < min <= max (got {}..{})",
                backoff_min_minutes, backoff_max_minutes
            )));
        }

        let probe_addr = parse_or(&lookup, "PROBE_ADDR", defaults.probe_addr)?;

        Ok(Self {
            namespace,
            concurrency,
            requeue_after,
            reconcile_timeout,
            backoff_min_minutes,
            backoff_max_minutes,
            probe_addr,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}
