//! Redis RBAC: the redis ServiceAccount and its RoleBinding.

use super::ComponentReconciler;
use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::controller::reconciler::aggregate::{StatusField, StatusKey};
use crate::controller::reconciler::context::ReconcileContext;
use crate::controller::reconciler::error::ReconcileError;
use crate::controller::synthesize::{redis_role_binding, redis_service_account, DesiredObject};
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::runtime::capabilities::Capabilities;
use async_trait::async_trait;

/// Owns no status field; roleRef drift surfaces through the `Reconciled` condition
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisComponent;

#[async_trait]
impl<C: ClusterClient + 'static> ComponentReconciler<C> for RedisComponent {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn owned_fields(&self) -> &'static [StatusKey] {
        &[]
    }

    fn synthesize(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        _config: &ControllerConfig,
    ) -> Vec<DesiredObject> {
        vec![
            DesiredObject::ServiceAccount(redis_service_account(cr)),
            DesiredObject::RoleBinding(redis_role_binding(cr)),
        ]
    }

    async fn compute_status(
        &self,
        _ctx: &ReconcileContext<'_, C>,
        _cr: &ArgoCD,
        _current: &ArgoCDStatus,
    ) -> Result<Vec<StatusField>, ReconcileError> {
        Ok(Vec::new())
    }
}
