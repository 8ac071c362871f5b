//! NFDeployment CRD
//!
//! Declares the intent to run one network function instance. The `provider`
//! selects which pipeline renders the child resources; `parameterValues` and
//! `interfaces` feed the generated configuration.

use crate::condition::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "workload.nephio.org",
    version = "v1alpha1",
    kind = "NFDeployment",
    namespaced,
    status = "NFDeploymentStatus",
    shortname = "nfd",
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NFDeploymentSpec {
    /// Provider identifier, e.g. `upf.sdcore.io`
    pub provider: String,

    /// Free-form named parameters (first match wins on duplicate names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_values: Vec<ParameterValue>,

    /// Network interfaces attached to the network function
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceConfig>,
}

/// Named parameter, e.g. `capacity: large`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

impl ParameterValue {
    /// Build a parameter from a name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Network interface of the network function
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceConfig {
    /// Logical interface name (`n2`, `n3`, `n4`, `n6`, ...)
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Ipv4Config>,

    #[serde(default, rename = "vlanID", skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
}

/// IPv4 addressing of an interface
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ipv4Config {
    /// Address with routing prefix, e.g. `192.168.250.3/24`
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

/// Raised when an interface address cannot be reduced to a host address.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid IPv4 address '{address}'")]
pub struct AddressError {
    pub address: String,
}

impl Ipv4Config {
    /// Host part of `address`, with any `/prefix` suffix removed.
    pub fn host_address(&self) -> Result<Ipv4Addr, AddressError> {
        let host = self
            .address
            .split_once('/')
            .map_or(self.address.as_str(), |(host, _)| host);
        host.trim().parse().map_err(|_| AddressError {
            address: self.address.clone(),
        })
    }
}

/// Observed state of an NFDeployment
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NFDeploymentStatus {
    /// Generation of the managed workload last observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// `Available` and `Ready`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl NFDeploymentStatus {
    /// Condition of the given type, if reported
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_address_strips_prefix() {
        let cfg = Ipv4Config {
            address: "192.168.250.3/24".to_string(),
            gateway: None,
        };
        assert_eq!(cfg.host_address(), Ok(Ipv4Addr::new(192, 168, 250, 3)));
    }

    #[test]
    fn test_host_address_without_prefix() {
        let cfg = Ipv4Config {
            address: "10.0.0.7".to_string(),
            gateway: None,
        };
        assert_eq!(cfg.host_address(), Ok(Ipv4Addr::new(10, 0, 0, 7)));
    }

    #[test]
    fn test_host_address_rejects_garbage() {
        let cfg = Ipv4Config {
            address: "not-an-ip/24".to_string(),
            gateway: None,
        };
        assert!(cfg.host_address().is_err());
    }

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: NFDeploymentSpec = serde_json::from_value(serde_json::json!({
            "provider": "upf.sdcore.io",
            "parameterValues": [{"name": "capacity", "value": "large"}],
            "interfaces": [{"name": "n4", "ipv4": {"address": "192.168.250.3/24"}, "vlanID": 12}]
        }))
        .unwrap();

        assert_eq!(spec.provider, "upf.sdcore.io");
        assert_eq!(spec.parameter_values, vec![ParameterValue::new("capacity", "large")]);
        assert_eq!(spec.interfaces[0].vlan_id, Some(12));
    }
}
