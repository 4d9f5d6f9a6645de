//! # Constants
//!
//! Default values, well-known names and label keys shared across the operator.

/// Default port for the metrics and health server
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the HTTP server to bind before giving up (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Poll interval while waiting for the HTTP server (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Maximum number of ArgoCD resources reconciled concurrently
pub const DEFAULT_RECONCILE_CONCURRENCY: u16 = 4;

/// Requeue interval after a successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Requeue interval after an optimistic concurrency conflict (seconds)
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 5;

/// Fallback requeue when the backoff map cannot be locked (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Fibonacci backoff bounds for failed reconciliations (minutes)
pub const BACKOFF_MIN_MINUTES: u64 = 1;
pub const BACKOFF_MAX_MINUTES: u64 = 10;

/// Delay before restarting a failed watch stream (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Initial and maximum backoff for a throttled watch stream (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_MS: u64 = 1_000;
pub const MAX_WATCH_BACKOFF_MS: u64 = 30_000;

/// Field manager reported on writes made by the operator
pub const FIELD_MANAGER: &str = "argocd-operator";

// Standard labels carried by every managed object
pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";

pub const PART_OF_ARGOCD: &str = "argocd";
pub const MANAGED_BY_OPERATOR: &str = "argocd-operator";

// Owner annotations
pub const ANNOTATION_OWNER_NAME: &str = "argocds.argoproj.io/name";
pub const ANNOTATION_OWNER_NAMESPACE: &str = "argocds.argoproj.io/namespace";

/// Annotation bumped by `argocdctl reconcile` to force a new cycle
pub const ANNOTATION_RECONCILE_TRIGGER: &str = "argocds.argoproj.io/reconcile";

// Component names, also used as the `<instance>-<component>` object suffix
pub const COMPONENT_REDIS: &str = "redis";
pub const COMPONENT_REDIS_HA: &str = "redis-ha";
pub const COMPONENT_DEX: &str = "dex-server";
pub const COMPONENT_KEYCLOAK: &str = "keycloak";
pub const COMPONENT_NOTIFICATIONS: &str = "notifications-controller";
pub const COMPONENT_APPLICATIONSET: &str = "applicationset-controller";
pub const COMPONENT_SERVER: &str = "server";

/// Name of the DeploymentConfig older template-based Keycloak installs use
pub const LEGACY_KEYCLOAK_DEPLOYMENT_CONFIG: &str = "keycloak";

pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

// Platform API groups inspected at startup
pub const ROUTE_API_GROUP: &str = "route.openshift.io";
pub const TEMPLATE_API_GROUP: &str = "template.openshift.io";
pub const INGRESS_API_GROUP: &str = "networking.k8s.io";
pub const PROMETHEUS_API_GROUP: &str = "monitoring.coreos.com";

// Images
pub const DEFAULT_ARGOCD_IMAGE: &str = "quay.io/argoproj/argocd";
pub const DEFAULT_ARGOCD_VERSION: &str = "v2.13.1";
pub const DEFAULT_DEX_IMAGE: &str = "ghcr.io/dexidp/dex";
pub const DEFAULT_DEX_VERSION: &str = "v2.41.1";
pub const DEFAULT_KEYCLOAK_IMAGE: &str = "quay.io/keycloak/keycloak";
pub const DEFAULT_KEYCLOAK_VERSION: &str = "26.0";

/// Secret holding the server certificate when ingress TLS is requested
pub const SERVER_TLS_SECRET: &str = "argocd-secret";

/// Condition type summarizing the last reconcile cycle
pub const CONDITION_RECONCILED: &str = "Reconciled";
