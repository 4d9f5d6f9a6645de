//! # Error Policy
//!
//! Requeue decisions for failed reconciliations and classification of
//! watch stream errors.

use crate::client::ClusterClient;
use crate::constants;
use crate::controller::reconciler::{BackoffState, ReconcileError, Reconciler};
use crate::crd::ArgoCD;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle a failed reconcile
///
/// Stale writes requeue after a short fixed delay since a fresh read usually
/// succeeds. Cancellation waits for the next event. Everything else backs off
/// per resource on a Fibonacci schedule between one and ten minutes.
pub fn handle_reconciliation_error<C: ClusterClient + 'static>(
    obj: Arc<ArgoCD>,
    error: &ReconcileError,
    ctx: Arc<Reconciler<C>>,
) -> Action {
    let name = obj.instance_name();
    let namespace = obj.instance_namespace();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    match error {
        ReconcileError::Conflict { .. } => {
            warn!("Write conflict for {}/{}, requeueing: {}", namespace, name, error);
            observability::metrics::increment_requeues_total("conflict");
            return Action::requeue(Duration::from_secs(ctx.config.conflict_requeue_secs));
        }
        ReconcileError::Cancelled => {
            info!("Reconcile of {}/{} cancelled by shutdown", namespace, name);
            return Action::await_change();
        }
        _ => {}
    }

    error!("Reconciliation error for {}/{}: {:?}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(resource_key).or_insert_with(BackoffState::new);
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!(
                "Failed to lock backoff_states: {}, using default backoff",
                e
            );
            (constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}), next attempt at {}",
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Kind of failure reported by a watch stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401, RBAC revoked or token expired
    Unauthorized,
    /// 410, resource version too old
    Expired,
    /// 429, API server storage reinitializing
    Throttled,
    /// Object deleted between event and fetch
    NotFound,
    Other,
}

/// Classify a watch stream error from its rendered message
pub fn classify_stream_error(error_string: &str) -> WatchErrorClass {
    let contains = |needles: &[&str]| needles.iter().any(|n| error_string.contains(n));

    if contains(&["401", "Unauthorized"]) {
        WatchErrorClass::Unauthorized
    } else if contains(&["410", "too old resource version", "Expired", "Gone"]) {
        WatchErrorClass::Expired
    } else if contains(&["429", "storage is (re)initializing", "TooManyRequests"]) {
        WatchErrorClass::Throttled
    } else if error_string.contains("ObjectNotFound")
        || (error_string.contains("404") && error_string.contains("not found"))
    {
        WatchErrorClass::NotFound
    } else {
        WatchErrorClass::Other
    }
}

/// Log and pace a watch stream error
///
/// The controller's watcher restarts on its own; this only decides how long
/// to wait and what to tell the operator of the cluster.
pub async fn handle_watch_stream_error(error_string: &str, backoff: &AtomicU64) {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let restart_delay = Duration::from_secs(constants::DEFAULT_WATCH_RESTART_DELAY_SECS);
    match classify_stream_error(error_string) {
        WatchErrorClass::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized), RBAC may have been revoked or the token expired");
            error!("Verify the operator ClusterRole still grants list/watch on argocds.argoproj.io and its child kinds");
            tokio::time::sleep(restart_delay).await;
        }
        WatchErrorClass::Expired => {
            warn!(error_type = "410", "watch.error.resource_version_expired");
        }
        WatchErrorClass::Throttled => {
            let current = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms",
                current
            );
            tokio::time::sleep(Duration::from_millis(current)).await;
            backoff.store(
                (current * 2).min(constants::MAX_WATCH_BACKOFF_MS),
                Ordering::Relaxed,
            );
        }
        WatchErrorClass::NotFound => {
            warn!("Resource not found (likely deleted), continuing watch");
        }
        WatchErrorClass::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(restart_delay).await;
        }
    }
}
