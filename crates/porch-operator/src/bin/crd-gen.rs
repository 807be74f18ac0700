//! Print the PackageRevision CRD as YAML.
//!
//! Usage: `cargo run --bin crd-gen > config/crd/packagerevisions.yaml`

use porch_operator::crds;

fn main() -> anyhow::Result<()> {
    print!("{}", crds::crd_yaml()?);
    Ok(())
}
