//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Transport or API error from kube
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Write rejected because the object changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing name or namespace)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClusterError {
    /// Classify a failed write; a 409 from the API server is a [`ClusterError::Conflict`]
    pub fn from_write(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(e) if e.code == 409 => ClusterError::Conflict(e.message),
            other => ClusterError::Kube(other),
        }
    }
}
