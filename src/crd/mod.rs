//! # Custom Resource Definitions
//!
//! CRD types for the Argo CD operator.
//!
//! This module contains the `ArgoCD` custom resource the operator owns, its
//! composite status, and the OpenShift types (`Route`, `DeploymentConfig`) it
//! reads or writes when the platform serves them.

mod openshift;
mod status;

pub use openshift::*;
pub use status::*;

use crate::constants;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ArgoCD Custom Resource Definition
///
/// Declares one Argo CD installation. The operator reconciles its child
/// objects and reports health back through `status`.
///
/// # Example
///
/// ```yaml
/// apiVersion: argoproj.io/v1beta1
/// kind: ArgoCD
/// metadata:
///   name: example-argocd
///   namespace: argocd
/// spec:
///   ha:
///     enabled: false
///   sso:
///     provider: dex
///     dex:
///       openShiftOAuth: true
///   notifications:
///     enabled: true
///   applicationSet: {}
///   server:
///     route:
///       enabled: true
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "ArgoCD",
    group = "argoproj.io",
    version = "v1beta1",
    namespaced,
    status = "ArgoCDStatus",
    shortname = "argocd",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Host", "type":"string", "jsonPath":".status.host"}, {"name":"SSO", "type":"string", "jsonPath":".status.ssoConfig"}, {"name":"Reconciled", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Reconciled\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSpec {
    /// Argo CD container image (without tag)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Argo CD image tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// High availability settings
    #[serde(default)]
    pub ha: ArgoCDHASpec,
    /// Single sign-on provider selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso: Option<ArgoCDSSOSpec>,
    /// Legacy top-level Dex settings, superseded by `sso.dex`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex: Option<ArgoCDDexSpec>,
    /// Notifications controller
    #[serde(default)]
    pub notifications: ArgoCDNotificationsSpec,
    /// ApplicationSet controller; present means enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_set: Option<ArgoCDApplicationSetSpec>,
    /// Argo CD server exposure
    #[serde(default)]
    pub server: ArgoCDServerSpec,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDHASpec {
    /// Bind redis to the HA role instead of the single-instance one
    #[serde(default)]
    pub enabled: bool,
}

/// SSO provider type
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SSOProviderType {
    #[serde(alias = "Dex")]
    Dex,
    #[serde(alias = "Keycloak")]
    Keycloak,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSSOSpec {
    pub provider: SSOProviderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex: Option<ArgoCDDexSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keycloak: Option<ArgoCDKeycloakSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDDexSpec {
    /// Use the built-in OpenShift OAuth connector
    #[serde(default, rename = "openShiftOAuth")]
    pub open_shift_oauth: bool,
    /// Raw Dex connector configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl ArgoCDDexSpec {
    /// Dex has a connector to run: either OpenShift OAuth or a non-blank config.
    pub fn is_configured(&self) -> bool {
        self.open_shift_oauth
            || self
                .config
                .as_deref()
                .is_some_and(|config| !config.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDKeycloakSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDNotificationsSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDApplicationSetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDServerSpec {
    /// External hostname; defaults to the instance name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub route: ArgoCDRouteSpec,
    #[serde(default)]
    pub ingress: ArgoCDIngressSpec,
}

/// OpenShift Route exposure for the Argo CD server
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDRouteSpec {
    #[serde(default)]
    pub enabled: bool,
    /// Extra annotations; owner annotations take precedence
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Terminate TLS at the router (edge) and redirect plain HTTP
    #[serde(default)]
    pub tls: bool,
}

/// Ingress exposure for the Argo CD server
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDIngressSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,
    /// Extra annotations; owner annotations take precedence
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub tls: bool,
}

impl ArgoCD {
    /// Instance name, the prefix of every child object
    pub fn instance_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Namespace the instance and all its children live in
    pub fn instance_namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("default")
    }

    /// `<instance>-<component>`
    pub fn child_name(&self, component: &str) -> String {
        format!("{}-{}", self.instance_name(), component)
    }

    /// External hostname of the Argo CD server
    pub fn server_host(&self) -> String {
        self.spec
            .server
            .host
            .clone()
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| self.instance_name().to_string())
    }

    /// Argo CD image reference used by the controller workloads
    pub fn argocd_image(&self, default_image: &str) -> String {
        image_reference(
            self.spec.image.as_deref(),
            default_image,
            self.spec.version.as_deref(),
            constants::DEFAULT_ARGOCD_VERSION,
        )
    }
}

/// Build `image:tag`, or `image@digest` when the version is a digest
pub fn image_reference(
    image: Option<&str>,
    default_image: &str,
    version: Option<&str>,
    default_version: &str,
) -> String {
    let image = image.filter(|i| !i.is_empty()).unwrap_or(default_image);
    let version = version.filter(|v| !v.is_empty()).unwrap_or(default_version);
    if version.starts_with("sha256:") {
        format!("{image}@{version}")
    } else {
        format!("{image}:{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_from_camel_case() {
        let spec: ArgoCDSpec = serde_json::from_value(serde_json::json!({
            "ha": { "enabled": true },
            "sso": { "provider": "keycloak" },
            "dex": { "openShiftOAuth": true },
            "notifications": { "enabled": true },
            "applicationSet": {},
            "server": { "ingress": { "enabled": true, "ingressClassName": "nginx" } }
        }))
        .unwrap();

        assert!(spec.ha.enabled);
        assert_eq!(spec.sso.unwrap().provider, SSOProviderType::Keycloak);
        assert!(spec.dex.unwrap().open_shift_oauth);
        assert!(spec.notifications.enabled);
        assert!(spec.application_set.is_some());
        assert_eq!(
            spec.server.ingress.ingress_class_name.as_deref(),
            Some("nginx")
        );
    }

    #[test]
    fn test_provider_accepts_capitalized_alias() {
        let sso: ArgoCDSSOSpec =
            serde_json::from_value(serde_json::json!({ "provider": "Dex" })).unwrap();
        assert_eq!(sso.provider, SSOProviderType::Dex);
    }

    #[test]
    fn test_dex_is_configured() {
        assert!(!ArgoCDDexSpec::default().is_configured());
        assert!(ArgoCDDexSpec {
            open_shift_oauth: true,
            ..Default::default()
        }
        .is_configured());
        assert!(!ArgoCDDexSpec {
            config: Some("   ".to_string()),
            ..Default::default()
        }
        .is_configured());
        assert!(ArgoCDDexSpec {
            config: Some("connectors: []".to_string()),
            ..Default::default()
        }
        .is_configured());
    }

    #[test]
    fn test_naming_helpers() {
        let mut cr = ArgoCD::new("example", ArgoCDSpec::default());
        cr.metadata.namespace = Some("argocd".to_string());

        assert_eq!(cr.child_name("redis"), "example-redis");
        assert_eq!(cr.instance_namespace(), "argocd");
        assert_eq!(cr.server_host(), "example");

        cr.spec.server.host = Some("argocd.example.com".to_string());
        assert_eq!(cr.server_host(), "argocd.example.com");
    }

    #[test]
    fn test_image_reference() {
        assert_eq!(
            image_reference(None, "quay.io/argoproj/argocd", None, "v2.13.1"),
            "quay.io/argoproj/argocd:v2.13.1"
        );
        assert_eq!(
            image_reference(Some("registry/argocd"), "unused", Some("sha256:abc"), "v1"),
            "registry/argocd@sha256:abc"
        );
        assert_eq!(
            image_reference(Some(""), "default", Some(""), "v1"),
            "default:v1"
        );
    }
}
