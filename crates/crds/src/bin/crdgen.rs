//! Prints the CRD manifests for this workspace as YAML

use crds::BareMetalAsset;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&BareMetalAsset::crd())?);
    Ok(())
}
