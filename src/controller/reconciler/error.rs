//! # Reconcile Errors
//!
//! Error taxonomy for a reconcile cycle. Terminal errors stop work on one
//! component and are reported through the `Reconciled` condition; every other
//! error aborts the cycle and goes to the error policy.

use super::aggregate::StatusKey;
use crate::client::ClientError;
use serde_json::Value;
use thiserror::Error;

/// An identity field of a live object differs from the desired value
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "structural drift on {kind} {namespace}/{name}: {field} is {existing}, desired {desired}; \
     the object must be deleted and recreated to change it"
)]
pub struct StructuralDriftError {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub field: String,
    pub existing: Value,
    pub desired: Value,
}

/// The ArgoCD spec asks for a combination the operator cannot run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationConflictError {
    #[error("illegal SSO configuration: multiple SSO configuration")]
    MultipleSsoConfigured,
    #[error("illegal SSO configuration: provider dex requires .spec.sso.dex or legacy .spec.dex configuration")]
    MissingDexConfiguration,
    #[error("illegal SSO configuration: .spec.sso.keycloak cannot be set when the provider is dex")]
    KeycloakConfigWithDexProvider,
    #[error("illegal SSO configuration: .spec.sso.dex cannot be set when the provider is keycloak")]
    DexConfigWithKeycloakProvider,
    #[error("illegal SSO configuration: provider dex requested but dex is disabled for this operator")]
    DexDisabled,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    StructuralDrift(#[from] StructuralDriftError),

    #[error(transparent)]
    ConfigurationConflict(#[from] ConfigurationConflictError),

    #[error("stale write to {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("transient API error: {0}")]
    Transient(#[source] ClientError),

    #[error("component {component} wrote status field {field} it does not own")]
    StatusOwnership {
        component: &'static str,
        field: StatusKey,
    },

    #[error("failed to convert {kind}: {source}")]
    Serialization {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Terminal errors end work on one component without aborting the cycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::StructuralDrift(_) | Self::ConfigurationConflict(_)
        )
    }

    /// Condition reason for this error
    pub fn reason(&self) -> &'static str {
        match self {
            Self::StructuralDrift(_) => "StructuralDrift",
            Self::ConfigurationConflict(_) => "ConfigurationConflict",
            Self::Conflict { .. } => "Conflict",
            Self::Transient(_) => "TransientError",
            Self::StatusOwnership { .. } => "StatusOwnership",
            Self::Serialization { .. } => "SerializationError",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl From<ClientError> for ReconcileError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Conflict {
                kind,
                namespace,
                name,
                message,
            } => Self::Conflict {
                resource: format!("{kind} {namespace}/{name}"),
                message,
            },
            // Lost a create race; a fresh cycle sees the object
            ClientError::AlreadyExists {
                kind,
                namespace,
                name,
            } => Self::Conflict {
                resource: format!("{kind} {namespace}/{name}"),
                message: "object already exists".to_string(),
            },
            other => Self::Transient(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_sso_message() {
        let err: ReconcileError = ConfigurationConflictError::MultipleSsoConfigured.into();
        assert!(err.to_string().contains("multiple SSO configuration"));
        assert!(err.is_terminal());
        assert_eq!(err.reason(), "ConfigurationConflict");
    }

    #[test]
    fn test_client_conflict_maps_to_conflict() {
        let err: ReconcileError = ClientError::Conflict {
            kind: "ArgoCD".to_string(),
            namespace: "argocd".to_string(),
            name: "example".to_string(),
            message: "stale".to_string(),
        }
        .into();
        assert!(matches!(err, ReconcileError::Conflict { .. }));
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_structural_drift_is_terminal() {
        let err: ReconcileError = StructuralDriftError {
            kind: "RoleBinding".to_string(),
            namespace: "argocd".to_string(),
            name: "example-redis".to_string(),
            field: "/roleRef".to_string(),
            existing: serde_json::json!({ "name": "other" }),
            desired: serde_json::json!({ "name": "example-redis" }),
        }
        .into();
        assert!(err.is_terminal());
        assert!(err.to_string().contains("/roleRef"));
    }
}
