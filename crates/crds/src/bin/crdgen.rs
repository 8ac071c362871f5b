//! Prints the NFDeployment CustomResourceDefinition as YAML.
//!
//! `cargo run -p crds --bin crdgen > config/crd/nfdeployment.yaml`

use crds::NFDeployment;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&NFDeployment::crd())?);
    Ok(())
}
