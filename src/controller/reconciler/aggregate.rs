//! # Status Aggregation
//!
//! Folds per-component status updates into the composite `ArgoCDStatus`.
//! Each field has a single owning component; a write from anyone else is an
//! error rather than a silent overwrite.

use super::error::ReconcileError;
use crate::constants::CONDITION_RECONCILED;
use crate::crd::{ArgoCDStatus, ComponentStatus, Condition};
use std::fmt;

/// Addressable scalar fields of the composite status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    Sso,
    SsoConfig,
    Host,
    Phase,
    NotificationsController,
    ApplicationSetController,
}

impl StatusKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sso => "sso",
            Self::SsoConfig => "ssoConfig",
            Self::Host => "host",
            Self::Phase => "phase",
            Self::NotificationsController => "notificationsController",
            Self::ApplicationSetController => "applicationSetController",
        }
    }

    fn slot(self, status: &mut ArgoCDStatus) -> &mut String {
        match self {
            Self::Sso => &mut status.sso,
            Self::SsoConfig => &mut status.sso_config,
            Self::Host => &mut status.host,
            Self::Phase => &mut status.phase,
            Self::NotificationsController => &mut status.notifications_controller,
            Self::ApplicationSetController => &mut status.application_set_controller,
        }
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status write requested by a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusField {
    pub key: StatusKey,
    pub value: String,
}

impl StatusField {
    pub fn new(key: StatusKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn state(key: StatusKey, state: ComponentStatus) -> Self {
        Self::new(key, state)
    }
}

/// Apply `fields` on behalf of `component`, which owns `owned`
pub fn apply_status_fields(
    component: &'static str,
    owned: &[StatusKey],
    fields: Vec<StatusField>,
    status: &mut ArgoCDStatus,
) -> Result<(), ReconcileError> {
    if let Some(foreign) = fields.iter().find(|f| !owned.contains(&f.key)) {
        return Err(ReconcileError::StatusOwnership {
            component,
            field: foreign.key,
        });
    }
    for field in fields {
        *field.key.slot(status) = field.value;
    }
    Ok(())
}

/// A terminal error recorded against one component during a cycle
#[derive(Debug)]
pub struct ComponentError {
    pub component: &'static str,
    pub error: ReconcileError,
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

/// Upsert a condition, keeping `lastTransitionTime` when its status is unchanged
pub fn set_condition(
    status: &mut ArgoCDStatus,
    r#type: &str,
    condition_status: &str,
    reason: Option<String>,
    message: Option<String>,
) {
    let now = || chrono::Utc::now().to_rfc3339();
    match status.conditions.iter_mut().find(|c| c.r#type == r#type) {
        Some(existing) => {
            if existing.status != condition_status {
                existing.last_transition_time = Some(now());
                existing.status = condition_status.to_string();
            }
            existing.reason = reason;
            existing.message = message;
        }
        None => status.conditions.push(Condition {
            r#type: r#type.to_string(),
            status: condition_status.to_string(),
            last_transition_time: Some(now()),
            reason,
            message,
        }),
    }
}

/// Summarize the cycle's terminal errors in the `Reconciled` condition
pub fn set_reconciled_condition(status: &mut ArgoCDStatus, errors: &[ComponentError]) {
    match errors.first() {
        None => set_condition(
            status,
            CONDITION_RECONCILED,
            "True",
            Some("ReconcileSucceeded".to_string()),
            Some("All components reconciled".to_string()),
        ),
        Some(first) => {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            set_condition(
                status,
                CONDITION_RECONCILED,
                "False",
                Some(first.error.reason().to_string()),
                Some(message),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::error::ConfigurationConflictError;

    #[test]
    fn test_owned_fields_applied() {
        let mut status = ArgoCDStatus {
            host: "kept".to_string(),
            ..Default::default()
        };
        apply_status_fields(
            "sso",
            &[StatusKey::Sso, StatusKey::SsoConfig],
            vec![
                StatusField::state(StatusKey::SsoConfig, ComponentStatus::Success),
                StatusField::state(StatusKey::Sso, ComponentStatus::Running),
            ],
            &mut status,
        )
        .unwrap();

        assert_eq!(status.sso_config, "Success");
        assert_eq!(status.sso, "Running");
        assert_eq!(status.host, "kept");
    }

    #[test]
    fn test_foreign_field_rejected_without_partial_write() {
        let mut status = ArgoCDStatus::default();
        let err = apply_status_fields(
            "notifications",
            &[StatusKey::NotificationsController],
            vec![
                StatusField::new(StatusKey::NotificationsController, "Running"),
                StatusField::new(StatusKey::Host, "evil"),
            ],
            &mut status,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::StatusOwnership {
                component: "notifications",
                field: StatusKey::Host
            }
        ));
        assert_eq!(status, ArgoCDStatus::default());
    }

    #[test]
    fn test_transition_time_preserved_when_status_unchanged() {
        let mut status = ArgoCDStatus::default();
        set_reconciled_condition(&mut status, &[]);
        let first = status.condition(CONDITION_RECONCILED).unwrap().clone();

        set_reconciled_condition(&mut status, &[]);
        assert_eq!(status.condition(CONDITION_RECONCILED).unwrap(), &first);
        assert_eq!(status.conditions.len(), 1);
    }

    #[test]
    fn test_failure_condition_carries_reason_and_message() {
        let mut status = ArgoCDStatus::default();
        let errors = vec![ComponentError {
            component: "sso",
            error: ConfigurationConflictError::MultipleSsoConfigured.into(),
        }];
        set_reconciled_condition(&mut status, &errors);

        let condition = status.condition(CONDITION_RECONCILED).unwrap();
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("ConfigurationConflict"));
        assert!(condition
            .message
            .as_deref()
            .unwrap()
            .contains("multiple SSO configuration"));
    }
}
