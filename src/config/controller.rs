//! # Controller Configuration
//!
//! Reconciler settings loaded from environment variables.

use super::{process_env, var_or_default};
use crate::constants::*;

/// Reconciler configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Raw `WATCH_NAMESPACE` value; resolved by `runtime::scope`
    pub watch_namespace: Option<String>,
    /// Maximum number of ArgoCD resources reconciled at once
    pub reconcile_concurrency: u16,
    /// Requeue interval after a successful cycle (seconds)
    pub resync_interval_secs: u64,
    /// Requeue interval after a stale write (seconds)
    pub conflict_requeue_secs: u64,
    /// Dex is switched off operator-wide (`DISABLE_DEX`)
    pub dex_disabled: bool,
    /// Default Argo CD image for controller workloads
    pub argocd_image: String,
    /// Default Dex image
    pub dex_image: String,
    /// Default Keycloak image
    pub keycloak_image: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            reconcile_concurrency: DEFAULT_RECONCILE_CONCURRENCY,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            dex_disabled: false,
            argocd_image: DEFAULT_ARGOCD_IMAGE.to_string(),
            dex_image: DEFAULT_DEX_IMAGE.to_string(),
            keycloak_image: DEFAULT_KEYCLOAK_IMAGE.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            watch_namespace: lookup("WATCH_NAMESPACE"),
            reconcile_concurrency: var_or_default(
                &lookup,
                "RECONCILE_CONCURRENCY",
                defaults.reconcile_concurrency,
            )
            .max(1),
            resync_interval_secs: var_or_default(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval_secs,
            ),
            conflict_requeue_secs: var_or_default(
                &lookup,
                "CONFLICT_REQUEUE_SECS",
                defaults.conflict_requeue_secs,
            ),
            dex_disabled: var_or_default(&lookup, "DISABLE_DEX", defaults.dex_disabled),
            argocd_image: image_or_default(&lookup, "ARGOCD_IMAGE", defaults.argocd_image),
            dex_image: image_or_default(&lookup, "DEX_IMAGE", defaults.dex_image),
            keycloak_image: image_or_default(&lookup, "KEYCLOAK_IMAGE", defaults.keycloak_image),
        }
    }
}

fn image_or_default<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}
