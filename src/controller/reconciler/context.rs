//! # Reconcile Context
//!
//! Everything a component needs during one cycle, passed explicitly instead
//! of read from globals.

use super::error::ReconcileError;
use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::runtime::capabilities::Capabilities;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative shutdown signal, flipped once and never reset
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Borrowed view of the reconciler for one cycle
pub struct ReconcileContext<'a, C> {
    pub client: &'a C,
    pub capabilities: &'a Capabilities,
    pub config: &'a ControllerConfig,
    pub cancellation: &'a CancellationFlag,
}

impl<C> std::fmt::Debug for ReconcileContext<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("capabilities", self.capabilities)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<'a, C: ClusterClient> ReconcileContext<'a, C> {
    pub fn new(
        client: &'a C,
        capabilities: &'a Capabilities,
        config: &'a ControllerConfig,
        cancellation: &'a CancellationFlag,
    ) -> Self {
        Self {
            client,
            capabilities,
            config,
            cancellation,
        }
    }

    /// Fail with `Cancelled` once shutdown has been requested
    pub fn check_cancelled(&self) -> Result<(), ReconcileError> {
        if self.cancellation.is_cancelled() {
            Err(ReconcileError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClient;

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_check_cancelled() {
        let client = InMemoryClient::new();
        let capabilities = Capabilities::default();
        let config = ControllerConfig::default();
        let flag = CancellationFlag::new();
        let ctx = ReconcileContext::new(&client, &capabilities, &config, &flag);

        assert!(ctx.check_cancelled().is_ok());
        flag.cancel();
        assert!(matches!(
            ctx.check_cancelled(),
            Err(ReconcileError::Cancelled)
        ));
    }
}
