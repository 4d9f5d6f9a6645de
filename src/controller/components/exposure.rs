//! Argo CD server exposure: Route or Ingress, and the resulting Host/Phase.

use super::ComponentReconciler;
use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::constants::COMPONENT_SERVER;
use crate::controller::reconciler::aggregate::{StatusField, StatusKey};
use crate::controller::reconciler::context::ReconcileContext;
use crate::controller::reconciler::error::ReconcileError;
use crate::controller::synthesize::{
    server_ingress, server_route, DesiredObject, ObjectKind, ObjectRef,
};
use crate::crd::{ArgoCD, ArgoCDStatus, ComponentStatus, Route};
use crate::runtime::capabilities::Capabilities;
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;

/// Host of the first router that admitted the route
pub fn route_host(route: &Route) -> String {
    route
        .status
        .as_ref()
        .and_then(|status| {
            status.ingress.iter().find(|ingress| {
                ingress.is_admitted() && ingress.host.as_deref().is_some_and(|h| !h.is_empty())
            })
        })
        .and_then(|ingress| ingress.host.clone())
        .unwrap_or_default()
}

/// Load-balancer entries in their reported order, hostname preferred over IP
pub fn ingress_host(ingress: &Ingress) -> String {
    let Some(entries) = ingress
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
    else {
        return String::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            entry
                .hostname
                .as_deref()
                .filter(|h| !h.is_empty())
                .or_else(|| entry.ip.as_deref().filter(|ip| !ip.is_empty()))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExposureComponent;

impl ExposureComponent {
    fn server_ref(cr: &ArgoCD, kind: ObjectKind) -> ObjectRef {
        ObjectRef::new(kind, cr.instance_namespace(), cr.child_name(COMPONENT_SERVER))
    }

    async fn resolve_host<C: ClusterClient>(
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
    ) -> Result<String, ReconcileError> {
        let namespace = cr.instance_namespace();
        let name = cr.child_name(COMPONENT_SERVER);
        let server = &cr.spec.server;

        if server.route.enabled && ctx.capabilities.route_api {
            if let Some(route) = ctx.client.get::<Route>(namespace, &name).await? {
                return Ok(route_host(&route));
            }
        }
        // read even without ingress discovery; absence is just `None`
        if server.ingress.enabled {
            if let Some(ingress) = ctx.client.get::<Ingress>(namespace, &name).await? {
                return Ok(ingress_host(&ingress));
            }
        }
        Ok(String::new())
    }
}

#[async_trait]
impl<C: ClusterClient + 'static> ComponentReconciler<C> for ExposureComponent {
    fn name(&self) -> &'static str {
        "server-exposure"
    }

    fn owned_fields(&self) -> &'static [StatusKey] {
        &[StatusKey::Host, StatusKey::Phase]
    }

    fn synthesize(
        &self,
        cr: &ArgoCD,
        capabilities: &Capabilities,
        _config: &ControllerConfig,
    ) -> Vec<DesiredObject> {
        let server = &cr.spec.server;
        let mut desired = Vec::new();
        if server.route.enabled && capabilities.route_api {
            desired.push(DesiredObject::Route(server_route(cr)));
        }
        if server.ingress.enabled && capabilities.ingress_api {
            desired.push(DesiredObject::Ingress(server_ingress(cr)));
        }
        desired
    }

    fn stale(
        &self,
        cr: &ArgoCD,
        capabilities: &Capabilities,
        _config: &ControllerConfig,
    ) -> Vec<ObjectRef> {
        let server = &cr.spec.server;
        let mut stale = Vec::new();
        if !server.route.enabled && capabilities.route_api {
            stale.push(Self::server_ref(cr, ObjectKind::Route));
        }
        if !server.ingress.enabled && capabilities.ingress_api {
            stale.push(Self::server_ref(cr, ObjectKind::Ingress));
        }
        stale
    }

    /// Phase is Available once a host is known, otherwise it keeps its
    /// previous value (Pending when there was none)
    async fn compute_status(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
        current: &ArgoCDStatus,
    ) -> Result<Vec<StatusField>, ReconcileError> {
        let host = Self::resolve_host(ctx, cr).await?;
        let phase = if !host.is_empty() {
            String::from(ComponentStatus::Available)
        } else if current.phase.is_empty() {
            String::from(ComponentStatus::Pending)
        } else {
            current.phase.clone()
        };
        Ok(vec![
            StatusField::new(StatusKey::Host, host),
            StatusField::new(StatusKey::Phase, phase),
        ])
    }
}
