//! Prints the `ArgoCD` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use argocd_operator::crd::ArgoCD;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ArgoCD::crd())?);
    Ok(())
}
