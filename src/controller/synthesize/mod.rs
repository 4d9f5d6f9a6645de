//! # Desired-State Synthesis
//!
//! Pure functions from an `ArgoCD` resource (plus platform capabilities) to the
//! objects that should exist for it. Nothing here performs I/O or fails;
//! unsupported combinations are reported by the components that call in.

mod deployment;
mod exposure;
mod labels;
mod rbac;

pub use deployment::*;
pub use exposure::*;
pub use labels::*;
pub use rbac::*;

use crate::crd::Route;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::ResourceExt;
use std::fmt;

/// A fully populated child object, recomputed every cycle
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredObject {
    RoleBinding(RoleBinding),
    ServiceAccount(ServiceAccount),
    Deployment(Deployment),
    Ingress(Ingress),
    Route(Route),
}

impl DesiredObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::RoleBinding(_) => ObjectKind::RoleBinding,
            Self::ServiceAccount(_) => ObjectKind::ServiceAccount,
            Self::Deployment(_) => ObjectKind::Deployment,
            Self::Ingress(_) => ObjectKind::Ingress,
            Self::Route(_) => ObjectKind::Route,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::RoleBinding(o) => o.name_any(),
            Self::ServiceAccount(o) => o.name_any(),
            Self::Deployment(o) => o.name_any(),
            Self::Ingress(o) => o.name_any(),
            Self::Route(o) => o.name_any(),
        }
    }

    pub fn namespace(&self) -> Option<String> {
        match self {
            Self::RoleBinding(o) => o.namespace(),
            Self::ServiceAccount(o) => o.namespace(),
            Self::Deployment(o) => o.namespace(),
            Self::Ingress(o) => o.namespace(),
            Self::Route(o) => o.namespace(),
        }
    }

    /// Reference to the same object, e.g. for deletion
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind(),
            namespace: self.namespace().unwrap_or_default(),
            name: self.name(),
        }
    }
}

/// Managed child kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    RoleBinding,
    ServiceAccount,
    Deployment,
    Ingress,
    Route,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoleBinding => "RoleBinding",
            Self::ServiceAccount => "ServiceAccount",
            Self::Deployment => "Deployment",
            Self::Ingress => "Ingress",
            Self::Route => "Route",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a child object that should not exist
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
