//! # Reconciler
//!
//! Drives an `ArgoCD` resource toward its declared state.
//!
//! ## Sub-modules
//!
//! - `comparison` - Managed-field tables and the generic field comparison
//! - `drift` - Create / correct / delete / recreate of single child objects
//! - `aggregate` - Status field ownership and the `Reconciled` condition
//! - `pipeline` - One full reconcile cycle over the component registry
//! - `status` - Status sub-resource persistence
//! - `context` / `types` - Per-cycle context and the shared reconciler

pub mod aggregate;
pub mod comparison;
pub mod context;
pub mod drift;
pub mod error;
pub mod pipeline;
pub mod status;
pub mod types;

pub use aggregate::{ComponentError, StatusField, StatusKey};
pub use context::{CancellationFlag, ReconcileContext};
pub use drift::Convergence;
pub use error::{ConfigurationConflictError, ReconcileError, StructuralDriftError};
pub use pipeline::{run_cycle, CycleReport};
pub use types::{BackoffState, Reconciler};

use crate::client::ClusterClient;
use crate::crd::ArgoCD;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Instrument};

/// Controller entry point for one ArgoCD
///
/// A clean cycle requeues after the resync interval. A cycle that recorded
/// terminal component errors waits for the next change to the resource, since
/// retrying cannot fix a structural drift or an illegal spec.
pub async fn reconcile<C: ClusterClient + 'static>(
    cr: Arc<ArgoCD>,
    ctx: Arc<Reconciler<C>>,
) -> Result<Action, ReconcileError> {
    let name = cr.instance_name().to_string();
    let namespace = cr.instance_namespace().to_string();
    let resource_key = format!("{namespace}/{name}");

    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
        resource.generation = cr.metadata.generation.unwrap_or_default()
    );

    let start = Instant::now();
    observability::metrics::increment_reconciliations();

    let context = ctx.context();
    let result = run_cycle(&context, &ctx.registry, &cr)
        .instrument(span.clone())
        .await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let _guard = span.enter();
    match result {
        Ok(report) if report.is_clean() => {
            ctx.reset_backoff(&resource_key);
            info!(
                status_persisted = report.status_persisted,
                phase = %report.status.phase,
                "reconciliation.success"
            );
            observability::metrics::increment_requeues_total("resync");
            Ok(Action::requeue(Duration::from_secs(
                ctx.config.resync_interval_secs,
            )))
        }
        Ok(report) => {
            ctx.reset_backoff(&resource_key);
            for component_error in &report.component_errors {
                warn!(
                    component = component_error.component,
                    reason = component_error.error.reason(),
                    "reconciliation.component_error: {}",
                    component_error.error
                );
            }
            Ok(Action::await_change())
        }
        Err(e) => {
            error!(error = %e, reason = e.reason(), "reconciliation.error");
            Err(e)
        }
    }
}
