//! # Controller Metrics
//!
//! Reconcile loop counters: cycles, errors, durations, drift handling and
//! requeues.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "argocd_operator_reconciliations_total",
        "Total number of ArgoCD reconcile cycles started",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "argocd_operator_reconciliation_errors_total",
        "Total number of reconcile cycles that aborted with an error",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "argocd_operator_reconciliation_duration_seconds",
            "Duration of ArgoCD reconcile cycles in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static DRIFT_CORRECTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "argocd_operator_drift_corrections_total",
            "Total number of child objects rewritten to their desired fields, by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create DRIFT_CORRECTIONS_TOTAL metric - this should never happen")
});

static STRUCTURAL_DRIFT_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "argocd_operator_structural_drift_total",
            "Total number of child objects left alone because an immutable field drifted, by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create STRUCTURAL_DRIFT_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "argocd_operator_requeues_total",
            "Total number of requeues scheduled, by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(DRIFT_CORRECTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STRUCTURAL_DRIFT_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration_secs: f64) {
    RECONCILIATION_DURATION.observe(duration_secs);
}

pub fn increment_drift_corrections(kind: &str) {
    DRIFT_CORRECTIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_structural_drift(kind: &str) {
    STRUCTURAL_DRIFT_TOTAL.with_label_values(&[kind]).inc();
}

/// Reason is one of `resync`, `conflict`, `error-backoff`
pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
