//! # Reconciler Types
//!
//! The long-lived reconciler shared by every reconcile call.

use super::context::{CancellationFlag, ReconcileContext};
use crate::client::{ClusterClient, KubeClusterClient};
use crate::config::ControllerConfig;
use crate::constants::{BACKOFF_MAX_MINUTES, BACKOFF_MIN_MINUTES};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::components::ComponentRegistry;
use crate::runtime::capabilities::Capabilities;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Backoff state for a single resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(BACKOFF_MIN_MINUTES, BACKOFF_MAX_MINUTES),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared reconciler state
///
/// Holds the cluster client, the read-only capabilities and configuration,
/// the component pipeline and the per-resource backoff map used by the
/// error policy.
pub struct Reconciler<C: ClusterClient + 'static = KubeClusterClient> {
    pub client: C,
    pub capabilities: Capabilities,
    pub config: ControllerConfig,
    pub registry: ComponentRegistry<C>,
    pub cancellation: CancellationFlag,
    /// Backoff state per resource (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl<C: ClusterClient + 'static> std::fmt::Debug for Reconciler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("capabilities", &self.capabilities)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<C: ClusterClient + 'static> Reconciler<C> {
    pub fn new(client: C, capabilities: Capabilities, config: ControllerConfig) -> Self {
        Self {
            client,
            capabilities,
            config,
            registry: ComponentRegistry::standard(),
            cancellation: CancellationFlag::new(),
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Borrowed context for one cycle
    pub fn context(&self) -> ReconcileContext<'_, C> {
        ReconcileContext::new(
            &self.client,
            &self.capabilities,
            &self.config,
            &self.cancellation,
        )
    }

    /// Forget accumulated backoff after a successful cycle
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
