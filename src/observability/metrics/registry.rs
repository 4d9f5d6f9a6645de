//! # Metrics Registry
//!
//! Process-wide Prometheus registry and metric registration.

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REGISTER: Once = Once::new();

/// Register all operator metrics with the registry
///
/// Only the first call registers; later calls return `Ok(())`.
#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only if a metric name collides, which is a programming error"
)]
pub fn register_metrics() -> Result<()> {
    let mut result = Ok(());
    REGISTER.call_once(|| {
        result = super::controller_metrics::register_controller_metrics();
    });
    result
}

/// Render the registry in Prometheus text format
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
