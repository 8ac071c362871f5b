//! Session Management Function

use super::GUARANTEED_CAPACITY;
use crate::error::ControllerError;
use crate::reconciler::builder::{EnvSpec, EnvValue, PortSpec, ProviderDescriptor, Protocol};
use crate::reconciler::params::Parameters;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

const DEFAULT_N4_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 250, 4);

const RUN_SH: &str =
    "#!/bin/bash\ncd /free5gc\n./bin/smf -c /config/smfcfg.yaml -u /config/uerouting.yaml\n";

const UEROUTING_YAML: &str = r#"info:
  version: 1.0.0
  description: Routing information for UE

ueRoutingInfo:
  - SUPI: imsi-2089300007487
    AN: 192.168.250.1
    PathList:
      - DestinationIP: 10.60.0.0/16
        UPF: !!seq
          - BranchingUPF
          - AnchorUPF1
      - DestinationIP: 10.61.0.0/16
        UPF: !!seq
          - BranchingUPF
          - AnchorUPF2

routeProfile:
  - RouteProfileID: internet
    ForwardingPolicyID: 10

pfdDataForApp:
  - applicationId: edge
    pfds:
      - pfdID: pfd1
        flowDescriptions:
          - permit out ip from 10.60.0.0/16 8080 to any
"#;

fn render(params: &Parameters) -> Result<BTreeMap<String, String>, ControllerError> {
    let n4 = params.interface_or("n4", DEFAULT_N4_ADDRESS)?;
    let dns = params.dns;
    let smfcfg = format!(
        r#"info:
  version: 1.0.0
  description: SMF initial configuration

configuration:
  smfName: SMF
  sbi:
    scheme: http
    registerIPv4: {n4}
    bindingIPv4: 0.0.0.0
    port: 8080
  serviceNameList:
    - nsmf-pdusession
    - nsmf-event-exposure
    - nsmf-oam
  snssaiInfos:
    - sNssai:
        sst: 1
        sd: 010203
      dnnInfos:
        - dnn: internet
          dns:
            ipv4: {dns}
  pfcp:
    addr: {n4}
    nodeID: {n4}
    retransTimeout: 1
    maxRetrans: 3
  userplane_information:
    up_nodes:
      gNB1:
        type: AN
        an_ip: 192.168.250.1
      UPF:
        type: UPF
        node_id: 192.168.250.3
        up_resource_ip: 192.168.252.3
    links:
      - A: gNB1
        B: UPF
  nrfUri: http://nrf-service:8000
  urrPeriod: 10
  ulcl: false
"#
    );
    Ok(BTreeMap::from([
        ("smf-run.sh".to_string(), RUN_SH.to_string()),
        ("smfcfg.yaml".to_string(), smfcfg),
        ("uerouting.yaml".to_string(), UEROUTING_YAML.to_string()),
    ]))
}

/// SMF pipeline, provider `smf.sdcore.io`
pub static SMF: ProviderDescriptor = ProviderDescriptor {
    id: "smf.sdcore.io",
    name: "smf",
    display_name: "SMF",
    image: "omecproject/5gc-smf:rel-2.0.3",
    command: &["/bin/bash", "/config/smf-run.sh"],
    args: &[],
    config_mount_path: "/config",
    config_mode: None,
    ports: &[
        PortSpec {
            name: "pfcp",
            port: 8805,
            protocol: Protocol::Udp,
        },
        PortSpec {
            name: "sbi",
            port: 8080,
            protocol: Protocol::Tcp,
        },
    ],
    extra_services: &[],
    capacity: GUARANTEED_CAPACITY,
    capabilities: &[],
    networks: None,
    env: &[
        EnvSpec {
            name: "PFCP_PORT",
            value: EnvValue::Literal("8805"),
        },
        EnvSpec {
            name: "LOG_LEVEL",
            value: EnvValue::Literal("info"),
        },
    ],
    render_config: render,
};
