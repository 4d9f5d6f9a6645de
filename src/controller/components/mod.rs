//! # Components
//!
//! Each logical piece of an Argo CD installation is a [`ComponentReconciler`]:
//! it says which objects it wants, which ones must go, and how its slice of
//! the composite status is derived from the cluster.
//!
//! The registry runs them in a fixed order: sso, redis, server-exposure,
//! notifications, applicationset.

mod applicationset;
mod exposure;
mod notifications;
mod redis;
mod sso;

pub use applicationset::ApplicationSetComponent;
pub use exposure::{ingress_host, route_host, ExposureComponent};
pub use notifications::NotificationsComponent;
pub use redis::RedisComponent;
pub use sso::{select_sso_provider, SsoComponent, SsoSelection};

use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::controller::reconciler::aggregate::{StatusField, StatusKey};
use crate::controller::reconciler::context::ReconcileContext;
use crate::controller::reconciler::drift::{converge_desired, delete_ref};
use crate::controller::reconciler::error::ReconcileError;
use crate::controller::synthesize::{DesiredObject, ObjectRef};
use crate::crd::{ArgoCD, ArgoCDStatus, ComponentStatus};
use crate::runtime::capabilities::Capabilities;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use std::collections::HashSet;
use tracing::{debug, warn};

#[async_trait]
pub trait ComponentReconciler<C: ClusterClient + 'static>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Status fields this component is allowed to write
    fn owned_fields(&self) -> &'static [StatusKey];

    /// Objects that should exist
    fn synthesize(
        &self,
        cr: &ArgoCD,
        capabilities: &Capabilities,
        config: &ControllerConfig,
    ) -> Vec<DesiredObject>;

    /// Objects that should not exist (a disabled feature's leftovers)
    fn stale(
        &self,
        _cr: &ArgoCD,
        _capabilities: &Capabilities,
        _config: &ControllerConfig,
    ) -> Vec<ObjectRef> {
        Vec::new()
    }

    /// Converge the cluster onto `synthesize` and `stale`
    async fn reconcile(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
    ) -> Result<(), ReconcileError> {
        let desired = self.synthesize(cr, ctx.capabilities, ctx.config);
        let stale = self.stale(cr, ctx.capabilities, ctx.config);
        converge(ctx.client, &desired, &stale).await
    }

    /// Status fields derived from the cluster after `reconcile`
    async fn compute_status(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
        current: &ArgoCDStatus,
    ) -> Result<Vec<StatusField>, ReconcileError>;
}

/// Create/correct every desired object, then delete every stale one.
///
/// A terminal error on one object does not stop the others; the first one is
/// returned once all objects were visited. Any other error returns at once.
pub(crate) async fn converge<C: ClusterClient>(
    client: &C,
    desired: &[DesiredObject],
    stale: &[ObjectRef],
) -> Result<(), ReconcileError> {
    let mut terminal = None;

    for object in desired {
        match converge_desired(client, object).await {
            Ok(outcome) => debug!(
                "{} {}: {:?}",
                object.kind(),
                object.name(),
                outcome
            ),
            Err(e) if e.is_terminal() => {
                warn!("{} {} left as is: {}", object.kind(), object.name(), e);
                terminal.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    for object in stale {
        delete_ref(client, object).await?;
    }

    terminal.map_or(Ok(()), Err)
}

/// Rollout state of Deployment `namespace/name`; `Unknown` when absent
pub(crate) async fn deployment_status<C: ClusterClient>(
    client: &C,
    namespace: &str,
    name: &str,
) -> Result<ComponentStatus, ReconcileError> {
    let Some(deployment) = client.get::<Deployment>(namespace, name).await? else {
        return Ok(ComponentStatus::Unknown);
    };
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    Ok(ComponentStatus::from_replicas(desired, ready))
}

/// Ordered set of components with disjoint status ownership
pub struct ComponentRegistry<C: ClusterClient + 'static> {
    components: Vec<Box<dyn ComponentReconciler<C>>>,
}

impl<C: ClusterClient + 'static> std::fmt::Debug for ComponentRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.components.len())
            .finish()
    }
}

impl<C: ClusterClient + 'static> ComponentRegistry<C> {
    /// The operator's components in pipeline order
    pub fn standard() -> Self {
        Self {
            components: vec![
                Box::new(SsoComponent),
                Box::new(RedisComponent),
                Box::new(ExposureComponent),
                Box::new(NotificationsComponent),
                Box::new(ApplicationSetComponent),
            ],
        }
    }

    /// Build a registry, rejecting two components that claim the same field
    pub fn with_components(
        components: Vec<Box<dyn ComponentReconciler<C>>>,
    ) -> Result<Self, ReconcileError> {
        let mut claimed = HashSet::new();
        for component in &components {
            for field in component.owned_fields() {
                if !claimed.insert(*field) {
                    return Err(ReconcileError::StatusOwnership {
                        component: component.name(),
                        field: *field,
                    });
                }
            }
        }
        Ok(Self { components })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ComponentReconciler<C>> {
        self.components.iter().map(AsRef::as_ref)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClient;

    #[test]
    fn test_standard_order() {
        let registry = ComponentRegistry::<InMemoryClient>::standard();
        assert_eq!(
            registry.names(),
            vec![
                "sso",
                "redis",
                "server-exposure",
                "notifications",
                "applicationset"
            ]
        );
    }

    #[test]
    fn test_standard_ownership_is_disjoint() {
        let standard = ComponentRegistry::<InMemoryClient>::standard();
        let rebuilt = ComponentRegistry::<InMemoryClient>::with_components(
            standard.components,
        );
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_overlapping_ownership_rejected() {
        let components: Vec<Box<dyn ComponentReconciler<InMemoryClient>>> =
            vec![Box::new(NotificationsComponent), Box::new(NotificationsComponent)];
        let err = ComponentRegistry::with_components(components).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::StatusOwnership {
                field: StatusKey::NotificationsController,
                ..
            }
        ));
    }
}
