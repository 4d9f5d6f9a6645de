//! Shared fixtures for the integration tests.

#![allow(dead_code, reason = "not every test binary uses every fixture")]

use argocd_operator::client::InMemoryClient;
use argocd_operator::config::ControllerConfig;
use argocd_operator::controller::components::ComponentRegistry;
use argocd_operator::controller::reconciler::{
    run_cycle, CancellationFlag, CycleReport, ReconcileContext, ReconcileError,
};
use argocd_operator::crd::{ArgoCD, ArgoCDSpec};
use argocd_operator::runtime::Capabilities;

pub const NAMESPACE: &str = "argocd";
pub const NAME: &str = "example-argocd";

pub fn argocd(spec: ArgoCDSpec) -> ArgoCD {
    let mut cr = ArgoCD::new(NAME, spec);
    cr.metadata.namespace = Some(NAMESPACE.to_string());
    cr.metadata.generation = Some(1);
    cr
}

/// In-memory cluster with `cr` stored, and the stored copy
pub fn cluster_with(cr: &ArgoCD) -> (InMemoryClient, ArgoCD) {
    let client = InMemoryClient::new();
    let stored = client.seed(cr).unwrap();
    (client, stored)
}

/// Latest stored copy of the ArgoCD
pub fn stored(client: &InMemoryClient) -> ArgoCD {
    client.object::<ArgoCD>(NAMESPACE, NAME).unwrap()
}

pub struct Harness {
    pub capabilities: Capabilities,
    pub config: ControllerConfig,
    pub cancellation: CancellationFlag,
    pub registry: ComponentRegistry<InMemoryClient>,
}

impl Harness {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            config: ControllerConfig::default(),
            cancellation: CancellationFlag::new(),
            registry: ComponentRegistry::standard(),
        }
    }

    pub async fn cycle(
        &self,
        client: &InMemoryClient,
        cr: &ArgoCD,
    ) -> Result<CycleReport, ReconcileError> {
        let ctx = ReconcileContext::new(client, &self.capabilities, &self.config, &self.cancellation);
        run_cycle(&ctx, &self.registry, cr).await
    }
}
