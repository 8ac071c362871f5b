//! User Plane Function (BESS)

use super::tier;
use crate::error::ControllerError;
use crate::reconciler::builder::{CapacityTable, PortSpec, ProviderDescriptor, Protocol};
use crate::reconciler::params::Parameters;
use std::collections::BTreeMap;

const WRAPPER_SH: &str = r#"#!/bin/bash
# Configuration script for BESS-UPF
set -x

# Start the UPF
cd /opt/bess
./bessctl/bessctl run /opt/bess/bessctl/conf/up4.bess -- --no-core-id

# Keep the container running
tail -f /dev/null
"#;

const NETWORKS: &str = r#"[{"name":"n4-net","interface":"n4"},{"name":"n3-net","interface":"n3"},{"name":"n6-net","interface":"n6"}]"#;

fn render(params: &Parameters) -> Result<BTreeMap<String, String>, ControllerError> {
    let upf_yaml = format!(
        "version: 1.0\ndescription: UPF Configuration\ncapacity: {}\ndns: {}\n",
        params.capacity, params.dns
    );
    Ok(BTreeMap::from([
        ("wrapper.sh".to_string(), WRAPPER_SH.to_string()),
        ("upf.yaml".to_string(), upf_yaml),
    ]))
}

/// UPF pipeline, provider `upf.sdcore.io`
pub static UPF: ProviderDescriptor = ProviderDescriptor {
    id: "upf.sdcore.io",
    name: "upf",
    display_name: "UPF",
    image: "omecproject/5gc-upf:rel-1.0.0",
    command: &["/bin/bash", "/config/wrapper.sh"],
    args: &[],
    config_mount_path: "/config/",
    config_mode: Some(0o777),
    ports: &[PortSpec {
        name: "n4",
        port: 8805,
        protocol: Protocol::Udp,
    }],
    extra_services: &[],
    capacity: CapacityTable {
        small: tier("500m", "512Mi", "1000m", "1Gi", 1),
        medium: tier("1000m", "1Gi", "2000m", "2Gi", 1),
        large: tier("2000m", "2Gi", "4000m", "4Gi", 1),
    },
    capabilities: &["NET_ADMIN"],
    networks: Some(NETWORKS),
    env: &[],
    render_config: render,
};
