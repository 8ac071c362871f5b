//! Typed settings resolved from an NFDeployment's `parameterValues` and `interfaces`.

use crate::error::ControllerError;
use crds::{Ipv4Config, NFDeploymentSpec};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Recognised `parameterValues` names
pub const PARAM_CAPACITY: &str = "capacity";
pub const PARAM_DNS: &str = "dns";
/// Resolver written into generated configs when `dns` is absent
pub const DEFAULT_DNS: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// Capacity tier selecting a row of the provider's resource table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Capacity {
    #[default]
    Small,
    Medium,
    Large,
}

impl Capacity {
    /// Value as spelled in `parameterValues`
    pub fn as_str(&self) -> &'static str {
        match self {
            Capacity::Small => "small",
            Capacity::Medium => "medium",
            Capacity::Large => "large",
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capacity {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(Capacity::Small),
            "medium" => Ok(Capacity::Medium),
            "large" => Ok(Capacity::Large),
            other => Err(ControllerError::InvalidParameter(format!(
                "invalid capacity value: {}",
                other
            ))),
        }
    }
}

/// Settings every provider pipeline consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub capacity: Capacity,
    /// DNS server for the generated config
    pub dns: IpAddr,
    /// IPv4 block per interface name, first interface carrying one wins.
    /// Addresses are parsed only when a provider asks for them.
    pub interfaces: BTreeMap<String, Ipv4Config>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            capacity: Capacity::default(),
            dns: DEFAULT_DNS,
            interfaces: BTreeMap::new(),
        }
    }
}

impl Parameters {
    /// Host address of interface `name`, or `default` when the intent does not declare it
    pub fn interface_or(&self, name: &str, default: Ipv4Addr) -> Result<Ipv4Addr, ControllerError> {
        match self.interfaces.get(name) {
            Some(ipv4) => ipv4
                .host_address()
                .map_err(|e| ControllerError::InvalidParameter(format!("interface {}: {}", name, e))),
            None => Ok(default),
        }
    }
}

fn first_value<'a>(spec: &'a NFDeploymentSpec, name: &str) -> Option<&'a str> {
    spec.parameter_values
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.as_str())
}

/// Resolve typed parameters from the intent spec
///
/// Unrecognised parameter names are left for other consumers. Fails without
/// side effects on a bad `capacity` or `dns`; interface addresses are checked
/// by the provider that reads them.
pub fn extract(spec: &NFDeploymentSpec) -> Result<Parameters, ControllerError> {
    let capacity = match first_value(spec, PARAM_CAPACITY) {
        Some(raw) => raw.parse()?,
        None => Capacity::default(),
    };

    let dns = match first_value(spec, PARAM_DNS) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidParameter(format!("invalid dns value: {}", raw))
        })?,
        None => DEFAULT_DNS,
    };

    let mut interfaces = BTreeMap::new();
    for iface in &spec.interfaces {
        if let Some(ipv4) = iface.ipv4.as_ref() {
            interfaces.entry(iface.name.clone()).or_insert_with(|| ipv4.clone());
        }
    }

    Ok(Parameters {
        capacity,
        dns,
        interfaces,
    })
}
