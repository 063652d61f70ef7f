use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

/// Graceful shutdown for long-running watch commands.
///
/// Ctrl-C flips a shared flag; every view loop selects on
/// [`ShutdownCoordinator::wait`] and unmounts its resources when it fires.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Trigger shutdown on Ctrl-C.
    pub fn install_signal_handlers(&self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, shutting down");
                    tx.send_replace(true);
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        });
        info!("Shutdown coordinator ready - will stop on Ctrl-C");
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Final bookkeeping once views are unmounted. Pollers and tickers are
    /// aborted by their handles, so only metrics and logging remain.
    pub async fn shutdown_all_services() -> Result<()> {
        info!("Initiating graceful shutdown...");

        crate::observability::api_metrics().log_stats();
        crate::telemetry::shutdown_telemetry();

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_triggered());

        let waiter = coordinator.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        coordinator.trigger();
        handle.await.unwrap();
        assert!(coordinator.is_triggered());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_triggered() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger();
        timeout(Duration::from_secs(1), coordinator.wait()).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_all_services_flushes_metrics() {
        assert!(ShutdownCoordinator::shutdown_all_services().await.is_ok());
    }
}
