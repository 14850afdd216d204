//! Cooperative shutdown signal shared by long-running tasks

use tokio::sync::watch;
use tracing::info;

/// Sender side: flips every [`ShutdownSignal`] created from the same channel
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side, cheap to clone into each task
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

impl ShutdownHandle {
    /// Request shutdown of every task holding a signal
    pub fn trigger(&self) {
        // Err only means every receiver is already gone
        let _ = self.tx.send(true);
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested
    ///
    /// A dropped [`ShutdownHandle`] counts as a shutdown request.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Resolve on SIGINT or SIGTERM
pub async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_initially_not_triggered() {
        let (_handle, signal) = shutdown_channel();
        assert!(!signal.is_triggered());
    }

    #[tokio::test]
    async fn test_trigger_wakes_all_clones() {
        let (handle, signal) = shutdown_channel();
        let mut first = signal.clone();
        let mut second = signal;

        handle.trigger();

        tokio::time::timeout(Duration::from_secs(1), first.wait())
            .await
            .expect("first signal should resolve");
        tokio::time::timeout(Duration::from_secs(1), second.wait())
            .await
            .expect("second signal should resolve");
        assert!(first.is_triggered());
    }

    #[tokio::test]
    async fn test_dropped_handle_counts_as_shutdown() {
        let (handle, mut signal) = shutdown_channel();
        drop(handle);

        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("signal should resolve when handle is dropped");
    }

    #[tokio::test]
    async fn test_wait_pending_until_triggered() {
        let (_handle, mut signal) = shutdown_channel();

        let result = tokio::time::timeout(Duration::from_millis(20), signal.wait()).await;
        assert!(result.is_err(), "wait should not resolve without trigger");
    }
}
