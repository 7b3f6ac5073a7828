//! Cooperative shutdown signal.
//!
//! A [`ShutdownTrigger`] flips a watch channel once; every [`Shutdown`]
//! clone observes it. Long-running work races its await points against
//! [`Shutdown::cancelled`].

use tokio::sync::watch;

/// Sending half. Triggering is idempotent.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Receiving half, cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a linked trigger and signal.
    pub fn new() -> (ShutdownTrigger, Shutdown) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownTrigger { sender }, Shutdown { receiver })
    }

    /// A signal that never fires.
    pub fn never() -> Shutdown {
        let (_, receiver) = watch::channel(false);
        Shutdown { receiver }
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
