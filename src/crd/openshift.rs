//! # OpenShift Types
//!
//! The subset of `route.openshift.io/v1` Route and `apps.openshift.io/v1`
//! DeploymentConfig the operator reads and writes. These APIs are only used
//! when capability discovery reports them.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "Route",
    group = "route.openshift.io",
    version = "v1",
    namespaced,
    status = "RouteStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Left unset to let the router assign a host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub to: RouteTargetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTlsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_policy: Option<String>,
    /// Fields not modelled here (path, subdomain, alternateBackends, ...),
    /// carried through reads and writes untouched
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    /// Port name or number on the target service
    #[schemars(schema_with = "int_or_string_schema")]
    pub target_port: IntOrString,
}

fn int_or_string_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({ "x-kubernetes-int-or-string": true })
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTlsConfig {
    pub termination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,
    /// Certificates and keys managed by the cluster admin
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    #[serde(default)]
    pub ingress: Vec<RouteIngress>,
}

/// One router's view of the route
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,
    #[serde(default)]
    pub conditions: Vec<RouteIngressCondition>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngressCondition {
    pub r#type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RouteIngress {
    /// The router accepted the route (`Admitted=True`)
    pub fn is_admitted(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.r#type == "Admitted" && c.status == "True")
    }
}

/// Template-era workload kind; older Keycloak installs still run as one
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "DeploymentConfig",
    group = "apps.openshift.io",
    version = "v1",
    namespaced,
    status = "DeploymentConfigStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigSpec {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    #[serde(default)]
    pub available_replicas: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_spec_accepts_numeric_target_port() {
        let spec: RouteSpec = serde_json::from_value(serde_json::json!({
            "to": { "kind": "Service", "name": "argocd-server" },
            "port": { "targetPort": 8080 }
        }))
        .unwrap();
        assert_eq!(
            spec.port.map(|p| p.target_port),
            Some(IntOrString::Int(8080))
        );
    }

    #[test]
    fn test_route_spec_keeps_unmodelled_fields() {
        let raw = serde_json::json!({
            "to": { "kind": "Service", "name": "argocd-server" },
            "path": "/ui",
            "alternateBackends": [{ "kind": "Service", "name": "canary" }],
            "tls": { "termination": "reencrypt", "destinationCACertificate": "PEM" }
        });
        let spec: RouteSpec = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(spec.extra["path"], "/ui");

        let written = serde_json::to_value(&spec).unwrap();
        assert_eq!(written["path"], raw["path"]);
        assert_eq!(written["alternateBackends"], raw["alternateBackends"]);
        assert_eq!(written["tls"]["destinationCACertificate"], "PEM");
    }

    #[test]
    fn test_route_ingress_admitted() {
        let ingress: RouteIngress = serde_json::from_value(serde_json::json!({
            "host": "argocd",
            "conditions": [{ "type": "Admitted", "status": "True" }]
        }))
        .unwrap();
        assert!(ingress.is_admitted());

        let rejected = RouteIngress {
            conditions: vec![RouteIngressCondition {
                r#type: "Admitted".to_string(),
                status: "False".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(!rejected.is_admitted());
    }
}
