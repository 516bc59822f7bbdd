//! Stop signal for pump loops.

use tokio::sync::watch;

/// Receiving side of the stop signal, held by each pump.
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// Check if a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the stop signal.
    ///
    /// Also completes when every [`StopSender`] has been dropped, so an
    /// orphaned pump cannot wait forever.
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Sending side of the stop signal.
#[derive(Debug, Clone)]
pub struct StopSender {
    tx: watch::Sender<bool>,
}

impl StopSender {
    /// Ask every pump holding a matching token to stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Hand out another token for a new pump.
    pub fn token(&self) -> StopToken {
        StopToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a stop channel.
pub fn stop_channel() -> (StopSender, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopSender { tx }, StopToken { rx })
}
