//! # Controller
//!
//! Desired-state synthesis, per-component reconcilers, the reconcile
//! pipeline, and the HTTP server exposing metrics and health checks.

pub mod backoff;
pub mod components;
pub mod reconciler;
pub mod server;
pub mod synthesize;
