//! # Status Management
//!
//! Writes the composite status back to the ArgoCD status sub-resource.

use super::context::ReconcileContext;
use super::error::ReconcileError;
use crate::client::{ClientError, ClusterClient};
use crate::crd::{ArgoCD, ArgoCDStatus};
use tracing::{debug, info};

/// Persist `status` if it differs from what the resource already carries.
///
/// Returns whether a write happened. The write carries the resourceVersion the
/// cycle started from, so a concurrent change to the ArgoCD surfaces as
/// `ReconcileError::Conflict` and the cycle is re-run.
pub async fn persist_status<C: ClusterClient>(
    ctx: &ReconcileContext<'_, C>,
    cr: &ArgoCD,
    status: &ArgoCDStatus,
) -> Result<bool, ReconcileError> {
    let name = cr.instance_name();
    let namespace = cr.instance_namespace();

    // CRITICAL: skip unchanged status; every write is a watch event and
    // would trigger another cycle
    if cr.status.as_ref() == Some(status) {
        debug!("Skipping status update for {namespace}/{name} - status unchanged");
        return Ok(false);
    }

    let value = serde_json::to_value(status).map_err(|source| ReconcileError::Serialization {
        kind: "ArgoCDStatus".to_string(),
        source,
    })?;

    match ctx
        .client
        .patch_status::<ArgoCD>(
            namespace,
            name,
            cr.metadata.resource_version.as_deref(),
            &value,
        )
        .await
    {
        Ok(()) => {
            info!(
                resource.name = name,
                resource.namespace = namespace,
                phase = %status.phase,
                sso = %status.sso,
                "Updated ArgoCD status"
            );
            Ok(true)
        }
        Err(ClientError::NotFound { .. }) => {
            debug!("ArgoCD {namespace}/{name} was deleted during reconciliation");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
