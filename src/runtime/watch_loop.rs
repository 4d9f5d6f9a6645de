//! # Watch Loop
//!
//! Runs one `Controller` per watched namespace (or a single cluster-wide
//! one), each owning the child kinds the operator creates, and merges their
//! result streams.

use super::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use super::scope::NamespaceScope;
use crate::client::KubeClusterClient;
use crate::constants::DEFAULT_WATCH_BACKOFF_MS;
use crate::controller::reconciler::{reconcile, ReconcileError, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{ArgoCD, Route};
use anyhow::Result;
use futures::stream::{select_all, BoxStream};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::RoleBinding;
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::{Client, Resource};
use kube_runtime::controller::{self, Action, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type ControllerResult =
    Result<(ObjectRef<ArgoCD>, Action), controller::Error<ReconcileError, watcher::Error>>;

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Build the controller for one namespace, or all namespaces when `None`
fn build_controller(
    client: &Client,
    namespace: Option<&str>,
    reconciler: Arc<Reconciler<KubeClusterClient>>,
) -> BoxStream<'static, ControllerResult> {
    let capabilities = reconciler.capabilities;
    let concurrency = reconciler.config.reconcile_concurrency;

    let mut ctrl = Controller::new(
        scoped_api::<ArgoCD>(client, namespace),
        watcher::Config::default(),
    )
    .owns(
        scoped_api::<Deployment>(client, namespace),
        watcher::Config::default(),
    )
    .owns(
        scoped_api::<RoleBinding>(client, namespace),
        watcher::Config::default(),
    )
    .owns(
        scoped_api::<ServiceAccount>(client, namespace),
        watcher::Config::default(),
    );

    if capabilities.ingress_api {
        ctrl = ctrl.owns(
            scoped_api::<Ingress>(client, namespace),
            watcher::Config::default(),
        );
    }
    if capabilities.route_api {
        ctrl = ctrl.owns(
            scoped_api::<Route>(client, namespace),
            watcher::Config::default(),
        );
    }

    ctrl.with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(
            reconcile::<KubeClusterClient>,
            handle_reconciliation_error::<KubeClusterClient>,
            reconciler,
        )
        .boxed()
}

/// Flip the cancellation flag on SIGINT/SIGTERM so in-flight cycles stop
/// between components
fn spawn_shutdown_watcher(reconciler: &Arc<Reconciler<KubeClusterClient>>) {
    let cancellation = reconciler.cancellation.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        match tokio::signal::ctrl_c().await {
                            Ok(()) => cancellation.cancel(),
                            Err(e) => warn!("Failed to listen for SIGINT: {}", e),
                        }
                        return;
                    }
                };
            let sigint_error = tokio::select! {
                result = tokio::signal::ctrl_c() => result.err(),
                _ = sigterm.recv() => None,
            };
            if let Some(e) = sigint_error {
                warn!("Failed to listen for SIGINT, waiting for SIGTERM only: {}", e);
                sigterm.recv().await;
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for SIGINT: {}", e);
                return;
            }
        }
        info!("Shutdown requested, cancelling in-flight reconciliations");
        cancellation.cancel();
    });
}

/// Run the controllers until shutdown
pub async fn run_watch_loop(
    client: Client,
    scope: NamespaceScope,
    reconciler: Arc<Reconciler<KubeClusterClient>>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    spawn_shutdown_watcher(&reconciler);

    let streams: Vec<_> = match &scope {
        NamespaceScope::All => vec![build_controller(&client, None, reconciler.clone())],
        NamespaceScope::Namespaces(set) => set
            .iter()
            .map(|ns| build_controller(&client, Some(ns), reconciler.clone()))
            .collect(),
    };
    info!("Started {} ArgoCD controller(s)", streams.len());

    let watch_backoff = AtomicU64::new(DEFAULT_WATCH_BACKOFF_MS);
    let mut merged = select_all(streams);
    while let Some(result) = merged.next().await {
        match result {
            Ok((obj, action)) => {
                watch_backoff.store(DEFAULT_WATCH_BACKOFF_MS, Ordering::Relaxed);
                debug!(resource = %obj, ?action, "reconciliation.completed");
            }
            Err(controller::Error::ReconcilerFailed(e, obj)) => {
                debug!(resource = %obj, error = %e, "reconciliation.failed");
            }
            Err(e) => handle_watch_stream_error(&e.to_string(), &watch_backoff).await,
        }
    }

    server_state.set_ready(false);
    info!("All controllers stopped, shutting down");
    Ok(())
}
