//! # ArgoCD Status
//!
//! Composite status published on the `ArgoCD` resource and the per-component
//! state values written into it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the ArgoCD resource
///
/// Every field is owned by exactly one component. Fields a cycle does not
/// touch keep their previous value.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDStatus {
    /// Install status of the active SSO provider
    /// Values: Unknown, Pending, Running, Failed
    #[serde(default)]
    pub sso: String,
    /// Legality of the SSO configuration
    /// Values: Unknown, Success, Failed
    #[serde(default)]
    pub sso_config: String,
    /// Externally reachable host(s) of the Argo CD server, comma-joined
    #[serde(default)]
    pub host: String,
    /// Values: Pending, Available
    #[serde(default)]
    pub phase: String,
    /// Values: "", Unknown, Pending, Running
    #[serde(default)]
    pub notifications_controller: String,
    /// Values: Unknown, Pending, Running
    #[serde(default)]
    pub application_set_controller: String,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// `metadata.generation` the status was computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl ArgoCDStatus {
    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == r#type)
    }
}

/// Kubernetes condition
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// State of one managed component as rendered into the status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Unknown,
    Pending,
    Running,
    Failed,
    Available,
    Success,
}

impl ComponentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Failed => "Failed",
            Self::Available => "Available",
            Self::Success => "Success",
        }
    }

    /// Rollout state of a workload from its desired and ready replica counts
    pub fn from_replicas(desired: i32, ready: i32) -> Self {
        if ready == desired {
            Self::Running
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ComponentStatus> for String {
    fn from(status: ComponentStatus) -> Self {
        status.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_wire_names() {
        let status = ArgoCDStatus {
            sso_config: "Success".to_string(),
            notifications_controller: "Running".to_string(),
            application_set_controller: "Pending".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["ssoConfig"], "Success");
        assert_eq!(value["notificationsController"], "Running");
        assert_eq!(value["applicationSetController"], "Pending");
    }

    #[test]
    fn test_from_replicas() {
        assert_eq!(ComponentStatus::from_replicas(1, 0), ComponentStatus::Pending);
        assert_eq!(ComponentStatus::from_replicas(2, 2), ComponentStatus::Running);
        assert_eq!(ComponentStatus::from_replicas(0, 0), ComponentStatus::Running);
    }
}
