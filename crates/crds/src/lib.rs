//! SD-Core operator CRD definitions
//!
//! Kubernetes Custom Resource Definitions consumed by the NFDeployment controller.

pub mod nf_deployment;
pub mod condition;

pub use nf_deployment::*;
pub use condition::*;
