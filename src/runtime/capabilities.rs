//! # Platform Capabilities
//!
//! Which optional APIs the cluster serves. Resolved once at startup through
//! API discovery and passed read-only into every reconcile.

use crate::constants::{
    INGRESS_API_GROUP, PROMETHEUS_API_GROUP, ROUTE_API_GROUP, TEMPLATE_API_GROUP,
};
use anyhow::{Context, Result};
use kube::discovery::Discovery;
use kube::Client;
use tracing::info;

/// Optional API groups available on the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// OpenShift Routes (`route.openshift.io`)
    pub route_api: bool,
    /// Networking Ingress (`networking.k8s.io`)
    pub ingress_api: bool,
    /// OpenShift Templates (`template.openshift.io`), implies DeploymentConfig keycloak
    pub template_api: bool,
    /// Prometheus operator (`monitoring.coreos.com`)
    pub prometheus_api: bool,
}

impl Capabilities {
    /// Plain Kubernetes: Ingress only
    pub fn kubernetes() -> Self {
        Self {
            ingress_api: true,
            ..Self::default()
        }
    }

    /// OpenShift: Routes, Templates and Ingress
    pub fn openshift() -> Self {
        Self {
            route_api: true,
            ingress_api: true,
            template_api: true,
            prometheus_api: false,
        }
    }

    /// Derive capabilities from the served API group names
    pub fn from_groups<'a, I>(groups: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut caps = Self::default();
        for group in groups {
            match group {
                ROUTE_API_GROUP => caps.route_api = true,
                INGRESS_API_GROUP => caps.ingress_api = true,
                TEMPLATE_API_GROUP => caps.template_api = true,
                PROMETHEUS_API_GROUP => caps.prometheus_api = true,
                _ => {}
            }
        }
        caps
    }

    /// Discover API groups on the server once
    pub async fn discover(client: &Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .context("API discovery failed")?;
        let caps = Self::from_groups(discovery.groups().map(|g| g.name()));
        info!(
            route_api = caps.route_api,
            ingress_api = caps.ingress_api,
            template_api = caps.template_api,
            prometheus_api = caps.prometheus_api,
            "capabilities.resolved"
        );
        Ok(caps)
    }
}
