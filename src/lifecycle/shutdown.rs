//! Cooperative shutdown signal.

use tokio::sync::broadcast;

/// Handle for telling every background task to stop.
///
/// One sender, cloned freely; the sweeper, the broker reconnector and
/// the subscription forwarders each hold a receiver and exit when the
/// signal fires. Firing is idempotent.
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

    /// Fire the signal. Receivers that subscribe afterwards never see it.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
