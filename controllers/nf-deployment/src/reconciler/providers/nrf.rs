//! Network Repository Function

use super::tier;
use crate::error::ControllerError;
use crate::reconciler::builder::{CapacityTable, PortSpec, ProviderDescriptor, Protocol};
use crate::reconciler::params::Parameters;
use std::collections::BTreeMap;

fn render(params: &Parameters) -> Result<BTreeMap<String, String>, ControllerError> {
    let nrfcfg = format!(
        r#"{{
  "nrfName": "NRF",
  "capacity": "{capacity}",
  "dnsServer": "{dns}",
  "sbi": {{
    "scheme": "http",
    "registerIPv4": "nrf-sbi",
    "bindingIPv4": "0.0.0.0",
    "port": 8000
  }},
  "nfManagement": {{
    "heartBeatTimer": 30
  }},
  "mongodb": {{
    "name": "free5gc",
    "url": "mongodb://mongodb:27017"
  }},
  "logger": {{
    "NRF": {{
      "debugLevel": "info",
      "reportCaller": false
    }}
  }}
}}
"#,
        capacity = params.capacity,
        dns = params.dns,
    );
    Ok(BTreeMap::from([("nrfcfg.json".to_string(), nrfcfg)]))
}

/// NRF pipeline, provider `nrf.sdcore.io`
pub static NRF: ProviderDescriptor = ProviderDescriptor {
    id: "nrf.sdcore.io",
    name: "nrf",
    display_name: "NRF",
    image: "omecproject/5gc-nrf:rel-1.6.3",
    command: &["/bin/nrf"],
    args: &["-c", "/etc/nrf/nrfcfg.json"],
    config_mount_path: "/etc/nrf",
    config_mode: None,
    ports: &[PortSpec {
        name: "sbi",
        port: 8000,
        protocol: Protocol::Tcp,
    }],
    extra_services: &[],
    capacity: CapacityTable {
        small: tier("250m", "256Mi", "500m", "512Mi", 1),
        medium: tier("500m", "512Mi", "1000m", "1Gi", 1),
        large: tier("1000m", "1Gi", "2000m", "2Gi", 1),
    },
    capabilities: &[],
    networks: None,
    env: &[],
    render_config: render,
};
