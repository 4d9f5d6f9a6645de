//! # Reconcile Pipeline
//!
//! One reconcile cycle: run every component in registry order (converge,
//! then compute its status fields), fold the results into the composite
//! status, and persist it.

use super::aggregate::{apply_status_fields, set_reconciled_condition, ComponentError};
use super::context::ReconcileContext;
use super::error::ReconcileError;
use super::status::persist_status;
use crate::client::ClusterClient;
use crate::controller::components::ComponentRegistry;
use crate::crd::{ArgoCD, ArgoCDStatus};
use tracing::{debug, warn, Instrument};

/// Result of a completed cycle
#[derive(Debug)]
pub struct CycleReport {
    /// Composite status as computed by this cycle
    pub status: ArgoCDStatus,
    /// Terminal errors, at most one per component
    pub component_errors: Vec<ComponentError>,
    /// Whether the status sub-resource was written
    pub status_persisted: bool,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.component_errors.is_empty()
    }
}

/// Run one full cycle for `cr`
///
/// Terminal component errors are collected and the remaining components still
/// run. Conflicts, transient API errors and cancellation abort the cycle;
/// corrections already applied stay in place.
pub async fn run_cycle<C: ClusterClient + 'static>(
    ctx: &ReconcileContext<'_, C>,
    registry: &ComponentRegistry<C>,
    cr: &ArgoCD,
) -> Result<CycleReport, ReconcileError> {
    let mut status = cr.status.clone().unwrap_or_default();
    let mut component_errors = Vec::new();

    for component in registry.iter() {
        ctx.check_cancelled()?;

        let span = tracing::span!(
            tracing::Level::DEBUG,
            "reconcile.component",
            component = component.name()
        );
        async {
            match component.reconcile(ctx, cr).await {
                Ok(()) => debug!("Component {} converged", component.name()),
                Err(e) if e.is_terminal() => {
                    warn!("Component {} not converged: {}", component.name(), e);
                    component_errors.push(ComponentError {
                        component: component.name(),
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            }

            let fields = component.compute_status(ctx, cr, &status).await?;
            apply_status_fields(
                component.name(),
                component.owned_fields(),
                fields,
                &mut status,
            )
        }
        .instrument(span)
        .await?;
    }

    ctx.check_cancelled()?;
    set_reconciled_condition(&mut status, &component_errors);
    status.observed_generation = cr.metadata.generation;

    let status_persisted = persist_status(ctx, cr, &status).await?;

    Ok(CycleReport {
        status,
        component_errors,
        status_persisted,
    })
}
