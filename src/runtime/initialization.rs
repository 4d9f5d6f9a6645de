//! # Initialization
//!
//! Operator startup: rustls setup, tracing, metrics, health server,
//! Kubernetes client, configuration, namespace scope, capabilities and the
//! shared reconciler.

use super::capabilities::Capabilities;
use super::scope::{resolve_namespace_scope, NamespaceScope};
use crate::client::KubeClusterClient;
use crate::config::{load_config, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::ArgoCD;
use crate::observability;
use anyhow::{anyhow, Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub scope: NamespaceScope,
    pub reconciler: Arc<Reconciler<KubeClusterClient>>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("scope", &self.scope)
            .field("reconciler", &self.reconciler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ when no default provider is selected via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow!("Failed to install rustls crypto provider"));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argocd_operator=info".into()),
        )
        .init();

    info!("Starting Argo CD operator v{}", env!("CARGO_PKG_VERSION"));

    observability::metrics::register_metrics()?;

    let (controller_config, server_config) = load_config();

    let server_state = Arc::new(ServerState::new());
    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_config, &server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let scope = resolve_namespace_scope(controller_config.watch_namespace.as_deref())
        .context("Invalid WATCH_NAMESPACE")?;
    match &scope {
        NamespaceScope::All => info!("Watching ArgoCD resources in all namespaces"),
        NamespaceScope::Namespaces(set) => info!(
            "Watching ArgoCD resources in {} namespace(s): {}",
            set.len(),
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
    }

    let capabilities = Capabilities::discover(&client).await?;

    let reconciler = Arc::new(Reconciler::new(
        KubeClusterClient::new(client.clone()),
        capabilities,
        controller_config,
    ));

    log_startup_summary(&client, &scope).await;

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        scope,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    config: &ServerConfig,
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log the ArgoCD resources present at startup, grouped by namespace
///
/// The controller's initial list reconciles them; this only checks that the
/// CRD is installed and gives operators a picture of what will be managed.
async fn log_startup_summary(client: &Client, scope: &NamespaceScope) {
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.summary",
        operation = "list_existing_resources"
    );
    let _guard = span.enter();

    let apis: Vec<Api<ArgoCD>> = match scope {
        NamespaceScope::All => vec![Api::all(client.clone())],
        NamespaceScope::Namespaces(set) => set
            .iter()
            .map(|ns| Api::namespaced(client.clone(), ns))
            .collect(),
    };

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for api in apis {
        match api.list(&ListParams::default()).await {
            Ok(list) => {
                for item in list.items {
                    by_namespace
                        .entry(item.instance_namespace().to_string())
                        .or_default()
                        .push(item.instance_name().to_string());
                }
            }
            Err(e) => {
                error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
                error!("Installation: crdgen | kubectl apply -f -");
                warn!(error = %e, "Continuing, the controller will retry");
                return;
            }
        }
    }

    let total: usize = by_namespace.values().map(Vec::len).sum();
    if total == 0 {
        info!("No existing ArgoCD resources found, watch will pick up new resources");
        return;
    }

    info!(
        "Found {} existing ArgoCD resource(s) in {} namespace(s)",
        total,
        by_namespace.len()
    );
    for (namespace, mut names) in by_namespace {
        names.sort();
        let shown = if names.len() <= 3 {
            names.join(", ")
        } else {
            format!("{}, ... ({} total)", names[..3].join(", "), names.len())
        };
        info!("  {}: {}", namespace, shown);
    }
}
