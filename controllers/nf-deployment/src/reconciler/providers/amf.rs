//! Access and Mobility Management Function

use super::GUARANTEED_CAPACITY;
use crate::error::ControllerError;
use crate::reconciler::builder::{EnvSpec, EnvValue, ExtraService, PortSpec, ProviderDescriptor, Protocol};
use crate::reconciler::params::Parameters;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

const DEFAULT_N2_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 251, 5);

const RUN_SH: &str = "#!/bin/bash\ncd /free5gc\n./bin/amf -c /opt/amfcfg.yaml\n";

fn render(params: &Parameters) -> Result<BTreeMap<String, String>, ControllerError> {
    let n2 = params.interface_or("n2", DEFAULT_N2_ADDRESS)?;
    let amfcfg = format!(
        r#"info:
  version: 1.0.0
  description: AMF initial configuration

configuration:
  amfName: AMF
  ngapIpList:
    - {n2}
  sbi:
    scheme: http
    registerIPv4: {n2}
    bindingIPv4: 0.0.0.0
    port: 8080
  serviceNameList:
    - namf-comm
    - namf-evts
    - namf-mt
    - namf-loc
    - namf-oam
  servedGuamiList:
    - plmnId:
        mcc: 208
        mnc: 93
      amfId: cafe00
  supportTaiList:
    - plmnId:
        mcc: 208
        mnc: 93
      tac: 1
  plmnSupportList:
    - plmnId:
        mcc: 208
        mnc: 93
      snssaiList:
        - sst: 1
          sd: 010203
        - sst: 1
          sd: 112233
  supportDnnList:
    - internet
  nrfUri: http://nrf-service:8000
  security:
    integrityOrder:
      - NIA2
    cipheringOrder:
      - NEA0
  networkName:
    full: free5GC
    short: free
  ngapPort: 38412
  sctpGrpcPort: 9000
  enableSctpLb: false
  t3502: 720
  t3512: 3600
  non3gppDeregistrationTimer: 3240
"#
    );
    Ok(BTreeMap::from([
        ("amf-run.sh".to_string(), RUN_SH.to_string()),
        ("amfcfg.yaml".to_string(), amfcfg),
    ]))
}

/// AMF pipeline, provider `amf.sdcore.io`
pub static AMF: ProviderDescriptor = ProviderDescriptor {
    id: "amf.sdcore.io",
    name: "amf",
    display_name: "AMF",
    image: "omecproject/5gc-amf:rel-1.6.4",
    command: &["/opt/amf-run.sh"],
    args: &[],
    config_mount_path: "/opt",
    config_mode: Some(0o755),
    ports: &[
        PortSpec {
            name: "ngapp",
            port: 38412,
            protocol: Protocol::Sctp,
        },
        PortSpec {
            name: "sbi",
            port: 8080,
            protocol: Protocol::Tcp,
        },
        PortSpec {
            name: "sctp-grpc",
            port: 9000,
            protocol: Protocol::Tcp,
        },
        PortSpec {
            name: "prometheus",
            port: 9089,
            protocol: Protocol::Tcp,
        },
    ],
    extra_services: &[ExtraService {
        suffix: "headless",
        headless: true,
        ports: &[PortSpec {
            name: "grpc",
            port: 9000,
            protocol: Protocol::Tcp,
        }],
    }],
    capacity: GUARANTEED_CAPACITY,
    capabilities: &[],
    networks: None,
    env: &[
        EnvSpec {
            name: "GRPC_GO_LOG_VERBOSITY_LEVEL",
            value: EnvValue::Literal("99"),
        },
        EnvSpec {
            name: "GRPC_GO_LOG_SEVERITY_LEVEL",
            value: EnvValue::Literal("info"),
        },
        EnvSpec {
            name: "GRPC_TRACE",
            value: EnvValue::Literal("all"),
        },
        EnvSpec {
            name: "GRPC_VERBOSITY",
            value: EnvValue::Literal("DEBUG"),
        },
        EnvSpec {
            name: "POD_IP",
            value: EnvValue::FieldRef("status.podIP"),
        },
    ],
    render_config: render,
};
