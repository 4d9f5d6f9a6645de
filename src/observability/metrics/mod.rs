//! # Metrics Module
//!
//! Prometheus metrics exposed on `/metrics`.
//!
//! ## Sub-modules
//!
//! - `registry` - Global registry, registration and text rendering
//! - `controller_metrics` - Reconcile cycles, errors, drift handling and requeues

pub mod controller_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use registry::{gather_text, register_metrics};
