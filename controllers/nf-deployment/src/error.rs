//! Controller-specific error types.
//!
//! Errors returned by a reconcile attempt. Everything except parameter and
//! configuration errors is retriable: the attempt is re-run in full.

use cluster_client::{ClusterError, ResourceKind};
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the NFDeployment controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Malformed or unrecognised parameter value on the intent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Create, update or pre-existence read of a child failed
    #[error("Failed to apply {kind} {name}: {source}")]
    ResourceApplyFailed {
        kind: ResourceKind,
        name: String,
        source: ClusterError,
    },

    /// Child could not be bound to its parent for garbage collection
    #[error("Owner reference failed: {0}")]
    OwnerReferenceFailed(String),

    /// Reading the NFDeployment itself failed
    #[error("Failed to fetch NFDeployment {name}: {source}")]
    IntentFetchFailed { name: String, source: ClusterError },

    /// Persisting NFDeployment status failed
    #[error("Failed to update status of NFDeployment {name}: {source}")]
    StatusUpdateFailed { name: String, source: ClusterError },

    /// Attempt deadline expired while waiting on the API server
    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether re-running the same attempt can succeed without the intent changing
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            ControllerError::InvalidParameter(_) | ControllerError::InvalidConfig(_)
        )
    }

    /// Short label for metrics
    pub fn metric_label(&self) -> &'static str {
        match self {
            ControllerError::InvalidParameter(_) => "invalid_parameter",
            ControllerError::ResourceApplyFailed { .. } => "resource_apply_failed",
            ControllerError::OwnerReferenceFailed(_) => "owner_reference_failed",
            ControllerError::IntentFetchFailed { .. } => "intent_fetch_failed",
            ControllerError::StatusUpdateFailed { .. } => "status_update_failed",
            ControllerError::DeadlineExceeded(_) => "deadline_exceeded",
            ControllerError::InvalidConfig(_) => "invalid_config",
            ControllerError::Kube(_) => "kube",
            ControllerError::Watch(_) => "watch",
        }
    }
}
