//! Cluster API access for the NFDeployment controller
//!
//! Wraps the handful of Kubernetes API calls the reconciler needs behind
//! [`ClusterClientTrait`] so reconciliation logic can run against
//! [`MockClusterClient`] in unit tests.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, KubeClusterClient, ResourceKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//!
//! let intent = client.get_nf_deployment("sdcore", "upf-1").await?;
//! let deployment = client.get(ResourceKind::Deployment, "sdcore", "upf-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
pub use models::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterClient, MockOperation};
