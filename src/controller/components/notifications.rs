//! Notifications controller workload and status.

use super::{deployment_status, ComponentReconciler};
use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::constants::COMPONENT_NOTIFICATIONS;
use crate::controller::reconciler::aggregate::{StatusField, StatusKey};
use crate::controller::reconciler::context::ReconcileContext;
use crate::controller::reconciler::error::ReconcileError;
use crate::controller::synthesize::{notifications_deployment, DesiredObject, ObjectKind, ObjectRef};
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::runtime::capabilities::Capabilities;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationsComponent;

#[async_trait]
impl<C: ClusterClient + 'static> ComponentReconciler<C> for NotificationsComponent {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn owned_fields(&self) -> &'static [StatusKey] {
        &[StatusKey::NotificationsController]
    }

    fn synthesize(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        config: &ControllerConfig,
    ) -> Vec<DesiredObject> {
        if cr.spec.notifications.enabled {
            vec![DesiredObject::Deployment(notifications_deployment(cr, config))]
        } else {
            Vec::new()
        }
    }

    fn stale(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        _config: &ControllerConfig,
    ) -> Vec<ObjectRef> {
        if cr.spec.notifications.enabled {
            Vec::new()
        } else {
            vec![ObjectRef::new(
                ObjectKind::Deployment,
                cr.instance_namespace(),
                cr.child_name(COMPONENT_NOTIFICATIONS),
            )]
        }
    }

    /// Empty when disabled, otherwise the deployment's rollout state
    async fn compute_status(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
        _current: &ArgoCDStatus,
    ) -> Result<Vec<StatusField>, ReconcileError> {
        let value = if cr.spec.notifications.enabled {
            let state = deployment_status(
                ctx.client,
                cr.instance_namespace(),
                &cr.child_name(COMPONENT_NOTIFICATIONS),
            )
            .await?;
            String::from(state)
        } else {
            String::new()
        };
        Ok(vec![StatusField::new(StatusKey::NotificationsController, value)])
    }
}
