//! ApplicationSet controller workload and status.

use super::{deployment_status, ComponentReconciler};
use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::constants::COMPONENT_APPLICATIONSET;
use crate::controller::reconciler::aggregate::{StatusField, StatusKey};
use crate::controller::reconciler::context::ReconcileContext;
use crate::controller::reconciler::error::ReconcileError;
use crate::controller::synthesize::{applicationset_deployment, DesiredObject, ObjectKind, ObjectRef};
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::runtime::capabilities::Capabilities;
use async_trait::async_trait;

/// Enabled by the mere presence of `.spec.applicationSet`
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationSetComponent;

#[async_trait]
impl<C: ClusterClient + 'static> ComponentReconciler<C> for ApplicationSetComponent {
    fn name(&self) -> &'static str {
        "applicationset"
    }

    fn owned_fields(&self) -> &'static [StatusKey] {
        &[StatusKey::ApplicationSetController]
    }

    fn synthesize(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        config: &ControllerConfig,
    ) -> Vec<DesiredObject> {
        match cr.spec.application_set {
            Some(_) => vec![DesiredObject::Deployment(applicationset_deployment(cr, config))],
            None => Vec::new(),
        }
    }

    fn stale(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        _config: &ControllerConfig,
    ) -> Vec<ObjectRef> {
        match cr.spec.application_set {
            Some(_) => Vec::new(),
            None => vec![ObjectRef::new(
                ObjectKind::Deployment,
                cr.instance_namespace(),
                cr.child_name(COMPONENT_APPLICATIONSET),
            )],
        }
    }

    async fn compute_status(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
        _current: &ArgoCDStatus,
    ) -> Result<Vec<StatusField>, ReconcileError> {
        let state = deployment_status(
            ctx.client,
            cr.instance_namespace(),
            &cr.child_name(COMPONENT_APPLICATIONSET),
        )
        .await?;
        Ok(vec![StatusField::state(StatusKey::ApplicationSetController, state)])
    }
}
