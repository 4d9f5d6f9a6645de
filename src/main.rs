//! # Argo CD Operator
//!
//! A Kubernetes operator that reconciles `ArgoCD` custom resources into the
//! objects an Argo CD installation needs.
//!
//! ## Overview
//!
//! For every `ArgoCD` resource the operator:
//!
//! 1. **Synthesizes desired objects** - redis RBAC, the SSO provider, server
//!    Route/Ingress, notifications and applicationset controllers
//! 2. **Corrects drift** - rewrites managed fields only, leaving everything else
//!    set by users or other controllers alone
//! 3. **Reports status** - rolls per-component health into `.status`
//!
//! ## Features
//!
//! - **Platform aware**: Routes and DeploymentConfig keycloak on OpenShift,
//!   Ingress elsewhere, decided once at startup
//! - **Namespace scoping**: `WATCH_NAMESPACE` restricts the watched namespaces
//! - **Prometheus metrics**: Exposed on `/metrics`
//! - **Health checks**: `/healthz` and `/readyz`

use anyhow::Result;
use argocd_operator::runtime::initialization::initialize;
use argocd_operator::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.client,
        init_result.scope,
        init_result.reconciler,
        init_result.server_state,
    )
    .await
}
