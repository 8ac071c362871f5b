//! Status projection from the managed Deployment onto the NFDeployment.
//!
//! `Available` follows "at least one ready replica"; `Ready` additionally
//! requires every desired replica to be ready, so Ready never holds without
//! Available. Re-asserting an unchanged condition is not a change.

use chrono::{DateTime, Utc};
use crds::{CONDITION_AVAILABLE, CONDITION_READY, Condition, NFDeploymentStatus};
use k8s_openapi::api::apps::v1::Deployment;

/// `Available` reasons
pub const REASON_AVAILABLE: &str = "DeploymentAvailable";
pub const REASON_UNAVAILABLE: &str = "DeploymentUnavailable";
/// `Ready` reasons
pub const REASON_READY: &str = "Ready";
pub const REASON_NOT_READY: &str = "NotReady";

/// What the status projector needs to know about the workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkloadState {
    /// Deployment `metadata.generation`, copied to `observedGeneration`
    pub generation: Option<i64>,
    pub desired_replicas: i32,
    pub ready_replicas: i32,
}

impl WorkloadState {
    /// Read from the Deployment as applied; replicas default to 1, ready replicas to 0
    pub fn from_deployment(deployment: &Deployment) -> Self {
        Self {
            generation: deployment.metadata.generation,
            desired_replicas: deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            ready_replicas: deployment
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0),
        }
    }

    /// At least one replica is ready
    pub fn available(&self) -> bool {
        self.ready_replicas >= 1
    }

    /// Every desired replica is ready
    pub fn ready(&self) -> bool {
        self.available() && self.ready_replicas == self.desired_replicas
    }
}

/// Insert or replace the condition of the same type
///
/// Returns false (and keeps the old timestamp) when status, reason and
/// message are unchanged.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) if existing.same_state(&condition) => false,
        Some(existing) => {
            *existing = condition;
            true
        }
        None => {
            conditions.push(condition);
            true
        }
    }
}

/// Compute the next status and whether it differs from `current`
pub fn project(
    current: Option<&NFDeploymentStatus>,
    workload: &WorkloadState,
    display_name: &str,
    now: DateTime<Utc>,
) -> (NFDeploymentStatus, bool) {
    let mut status = current.cloned().unwrap_or_default();
    let mut changed = false;

    if status.observed_generation != workload.generation {
        status.observed_generation = workload.generation;
        changed = true;
    }

    let (reason, message) = if workload.available() {
        (REASON_AVAILABLE, format!("{} deployment is available", display_name))
    } else {
        (REASON_UNAVAILABLE, format!("{} deployment has no ready replicas", display_name))
    };
    let available = Condition::new(CONDITION_AVAILABLE, workload.available().into(), reason, message, now);
    changed |= set_condition(&mut status.conditions, available);

    let (reason, message) = if workload.ready() {
        (REASON_READY, format!("{} is ready", display_name))
    } else {
        (REASON_NOT_READY, format!("{} is not ready", display_name))
    };
    let ready = Condition::new(CONDITION_READY, workload.ready().into(), reason, message, now);
    changed |= set_condition(&mut status.conditions, ready);

    (status, changed)
}
