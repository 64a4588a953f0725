//! Process shutdown for the relay daemon.
//!
//! The binary's control task is the only subscriber that matters: when it
//! observes the signal it stops consuming config updates, closes the relay
//! (releasing every listener socket) and then stops the admin servers.

use tokio::sync::broadcast;

/// One-shot, cloneable shutdown signal.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Subscribing afterwards misses the signal.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no subscribers");
        }
    }

    /// Wait for Ctrl-C, then trigger. A failure to install the handler also
    /// triggers.
    pub async fn on_ctrl_c(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
            Err(e) => tracing::error!(error = %e, "Could not listen for Ctrl-C, shutting down"),
        }
        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_one_signal() {
        let shutdown = Shutdown::new();
        let mut control = shutdown.subscribe();
        let trigger = shutdown.clone();

        trigger.trigger();
        assert!(control.recv().await.is_ok());
    }

    #[test]
    fn late_subscribers_miss_the_signal() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut late = shutdown.subscribe();
        assert!(late.try_recv().is_err());
    }
}
