//! # Operator Configuration
//!
//! Operator-level configuration loaded from environment variables (populated
//! from the operator Deployment).
//!
//! All configuration has sensible defaults and can be overridden via environment
//! variables. It is read once at startup and shared read-only with every
//! reconcile.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

/// Load configuration from environment variables with defaults
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}

/// Read `key` through `lookup` and parse it, falling back to `default` when
/// the variable is unset or does not parse
pub(crate) fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Process environment as a lookup function
pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
