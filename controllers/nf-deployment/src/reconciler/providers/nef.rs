//! Network Exposure Function

use super::LIGHT_CAPACITY;
use crate::error::ControllerError;
use crate::reconciler::builder::{PortSpec, ProviderDescriptor, Protocol};
use crate::reconciler::params::Parameters;
use std::collections::BTreeMap;

const WRAPPER_SH: &str = r#"#!/bin/bash
set -e

NEF_CONFIG="/tmp/nefcfg.yaml"
cp /etc/nef/nefcfg.yaml "$NEF_CONFIG"

if [ -n "${NRF_ADDR}" ]; then
  sed -i "s|NRF_ADDR|${NRF_ADDR}|g" "$NEF_CONFIG"
else
  echo "Warning: NRF_ADDR not set, using default"
  sed -i "s|NRF_ADDR|127.0.0.1:8000|g" "$NEF_CONFIG"
fi

exec /bin/nef -nefcfg "$NEF_CONFIG"
"#;

fn render(params: &Parameters) -> Result<BTreeMap<String, String>, ControllerError> {
    let nefcfg = format!(
        r#"info:
  version: 1.0.0
  description: NEF initial configuration

configuration:
  nefName: NEF
  dnsServer: {dns}
  sbi:
    scheme: http
    registerIPv4: nef-service
    bindingIPv4: 0.0.0.0
    port: 8000
  serviceNameList:
    - nnef-eventexposure
    - nnef-pfdmanagement
  nrfUri: http://NRF_ADDR
  supportedPlmnList:
    - mcc: 208
      mnc: 93
  apiList:
    - apiName: Nnef_EventExposure
      versions:
        - uri: /nef-event-exposure/v1
          version: 1.0.0
    - apiName: Nnef_PFDManagement
      versions:
        - uri: /nef-pfd-management/v1
          version: 1.0.0
  servingAreas:
    - areas:
        - areaCode: A001
          areaName: Area 1
  defaultBdtRefId: BdtRefPolicy01
  apis:
    exposureAPI:
      enabled: true
      port: 8080
      basePath: /api/v1
"#,
        dns = params.dns,
    );
    Ok(BTreeMap::from([
        ("wrapper.sh".to_string(), WRAPPER_SH.to_string()),
        ("nefcfg.yaml".to_string(), nefcfg),
    ]))
}

/// NEF pipeline, provider `nef.sdcore.io`
pub static NEF: ProviderDescriptor = ProviderDescriptor {
    id: "nef.sdcore.io",
    name: "nef",
    display_name: "NEF",
    image: "registry.opennetworking.org/sdcore/nef:latest",
    command: &["/bin/sh", "/etc/nef/wrapper.sh"],
    args: &[],
    config_mount_path: "/etc/nef",
    config_mode: None,
    ports: &[
        PortSpec {
            name: "http",
            port: 8000,
            protocol: Protocol::Tcp,
        },
        PortSpec {
            name: "api",
            port: 8080,
            protocol: Protocol::Tcp,
        },
    ],
    extra_services: &[],
    capacity: LIGHT_CAPACITY,
    capabilities: &[],
    networks: None,
    env: &[],
    render_config: render,
};
