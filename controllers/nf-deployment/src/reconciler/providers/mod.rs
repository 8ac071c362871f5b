//! SD-Core provider descriptors and the dispatch table keyed by provider string.

mod amf;
mod nef;
mod nrf;
mod nssf;
mod smf;
mod upf;

pub use amf::AMF;
pub use nef::NEF;
pub use nrf::NRF;
pub use nssf::NSSF;
pub use smf::SMF;
pub use upf::UPF;

use crate::error::ControllerError;
use crate::reconciler::builder::{CapacityTable, ProviderDescriptor, ResourceTier};
use std::collections::HashMap;

/// Shorthand for a [`ResourceTier`] row in the provider tables
pub(crate) const fn tier(
    cpu_request: &'static str,
    memory_request: &'static str,
    cpu_limit: &'static str,
    memory_limit: &'static str,
    replicas: i32,
) -> ResourceTier {
    ResourceTier {
        cpu_request,
        memory_request,
        cpu_limit,
        memory_limit,
        replicas,
    }
}

/// Control-plane functions sized with requests equal to limits
pub(crate) const GUARANTEED_CAPACITY: CapacityTable = CapacityTable {
    small: tier("500m", "512Mi", "500m", "512Mi", 1),
    medium: tier("1000m", "1Gi", "1000m", "1Gi", 1),
    large: tier("2000m", "2Gi", "2000m", "2Gi", 1),
};

/// Lightweight SBI-only functions, scaled out at the large tier
pub(crate) const LIGHT_CAPACITY: CapacityTable = CapacityTable {
    small: tier("100m", "128Mi", "200m", "256Mi", 1),
    medium: tier("200m", "256Mi", "400m", "512Mi", 1),
    large: tier("400m", "512Mi", "800m", "1Gi", 2),
};

/// Lookup table from provider string to pipeline descriptor
///
/// Built once at start-up and read-only afterwards.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    by_key: HashMap<String, &'static ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every SD-Core network function under its id and short name
    pub fn sdcore() -> Result<Self, ControllerError> {
        let mut registry = Self::new();
        for provider in [&UPF, &AMF, &SMF, &NRF, &NSSF, &NEF] {
            registry.register(provider)?;
        }
        Ok(registry)
    }

    /// Register `provider` under both `id` and `name`
    pub fn register(&mut self, provider: &'static ProviderDescriptor) -> Result<(), ControllerError> {
        for key in [provider.id, provider.name] {
            if self.by_key.contains_key(key) {
                return Err(ControllerError::InvalidConfig(format!(
                    "provider '{}' registered twice",
                    key
                )));
            }
        }
        self.by_key.insert(provider.id.to_string(), provider);
        self.by_key.insert(provider.name.to_string(), provider);
        Ok(())
    }

    /// Exact-match lookup; unknown providers resolve to `None`, never to a fallback
    pub fn lookup(&self, provider: &str) -> Option<&'static ProviderDescriptor> {
        self.by_key.get(provider).copied()
    }

    /// Number of registered keys, aliases included
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True when no provider is registered
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_key.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
