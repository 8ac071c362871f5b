//! Network Slice Selection Function

use super::LIGHT_CAPACITY;
use crate::error::ControllerError;
use crate::reconciler::builder::{PortSpec, ProviderDescriptor, Protocol};
use crate::reconciler::params::Parameters;
use std::collections::BTreeMap;

// ConfigMap mounts are read-only, so the config is copied before substitution
const WRAPPER_SH: &str = r#"#!/bin/bash
set -e

NSSF_CONFIG="/tmp/nssfcfg.yaml"
cp /etc/nssf/nssfcfg.yaml "$NSSF_CONFIG"

if [ -n "${NRF_ADDR}" ]; then
  sed -i "s|NRF_ADDR|${NRF_ADDR}|g" "$NSSF_CONFIG"
else
  echo "Warning: NRF_ADDR not set, using default"
  sed -i "s|NRF_ADDR|127.0.0.1:8000|g" "$NSSF_CONFIG"
fi

exec /bin/nssf -nssfcfg "$NSSF_CONFIG"
"#;

fn render(params: &Parameters) -> Result<BTreeMap<String, String>, ControllerError> {
    let nssfcfg = format!(
        r#"info:
  version: 1.0.0
  description: NSSF initial configuration

configuration:
  nssfName: NSSF
  dnsServer: {dns}
  sbi:
    scheme: http
    registerIPv4: nssf-service
    bindingIPv4: 0.0.0.0
    port: 8000
  serviceNameList:
    - nnssf-nsselection
    - nnssf-nssaiavailability
  nrfUri: http://NRF_ADDR
  supportedPlmnList:
    - mcc: 208
      mnc: 93
  supportedNssaiInPlmnList:
    - plmnId:
        mcc: 208
        mnc: 93
      supportedSnssaiList:
        - sst: 1
          sd: 010203
        - sst: 1
          sd: 112233
        - sst: 2
          sd: 000003
  nsiList:
    - snssai:
        sst: 1
        sd: 010203
      nsiInformationList:
        - nrfId: http://NRF_ADDR
          nsiId: 22
    - snssai:
        sst: 1
        sd: 112233
      nsiInformationList:
        - nrfId: http://NRF_ADDR
          nsiId: 23
    - snssai:
        sst: 2
        sd: 000003
      nsiInformationList:
        - nrfId: http://NRF_ADDR
          nsiId: 24
"#,
        dns = params.dns,
    );
    Ok(BTreeMap::from([
        ("wrapper.sh".to_string(), WRAPPER_SH.to_string()),
        ("nssfcfg.yaml".to_string(), nssfcfg),
    ]))
}

/// NSSF pipeline, provider `nssf.sdcore.io`
pub static NSSF: ProviderDescriptor = ProviderDescriptor {
    id: "nssf.sdcore.io",
    name: "nssf",
    display_name: "NSSF",
    image: "omecproject/5gc-nssf:rel-1.6.2",
    command: &["/bin/sh", "/etc/nssf/wrapper.sh"],
    args: &[],
    config_mount_path: "/etc/nssf",
    config_mode: None,
    ports: &[PortSpec {
        name: "sbi",
        port: 8000,
        protocol: Protocol::Tcp,
    }],
    extra_services: &[],
    capacity: LIGHT_CAPACITY,
    capabilities: &[],
    networks: None,
    env: &[],
    render_config: render,
};
