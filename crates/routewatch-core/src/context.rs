//! Runtime context: termination requests reaching the control loop.
//!
//! The binary forwards OS signals through a [`WatchContextHandle`]; the
//! scheduler only looks at the channel while it is waiting for the next tick,
//! so a request never interrupts a check or a write.

use tokio::sync::mpsc;

use crate::error::{Result, WatchError};
use crate::types::Signal;

/// Capacity of the signal queue.
const SIGNAL_QUEUE: usize = 16;

/// Receiving side, owned by the control loop.
#[derive(Debug)]
pub struct WatchContext {
    signal_rx: mpsc::Receiver<Signal>,
    shutdown: bool,
}

impl WatchContext {
    /// Creates a context and the handle used to signal it.
    #[must_use]
    pub fn new() -> (Self, WatchContextHandle) {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE);
        let ctx = Self {
            signal_rx,
            shutdown: false,
        };
        (ctx, WatchContextHandle { signal_tx })
    }

    /// Returns true once shutdown has been requested.
    #[must_use]
    pub const fn should_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Marks the loop for shutdown before its next tick.
    pub fn request_shutdown(&mut self) {
        self.shutdown = true;
    }

    /// Waits for a signal.
    ///
    /// Returns `None` once every handle is gone; no signal can arrive after
    /// that.
    pub async fn recv_signal(&mut self) -> Option<Signal> {
        let signal = self.signal_rx.recv().await?;
        self.shutdown = true;
        Some(signal)
    }
}

/// Handle for sending termination requests to a [`WatchContext`].
#[derive(Clone, Debug)]
pub struct WatchContextHandle {
    signal_tx: mpsc::Sender<Signal>,
}

impl WatchContextHandle {
    /// Sends a signal to the control loop.
    ///
    /// # Errors
    /// Returns an error if the loop has already exited.
    pub async fn send_signal(&self, signal: Signal) -> Result<()> {
        self.signal_tx
            .send(signal)
            .await
            .map_err(|_| WatchError::Signal("watch context closed".to_string()))
    }

    /// Requests graceful shutdown.
    ///
    /// # Errors
    /// Returns an error if the loop has already exited.
    pub async fn shutdown(&self) -> Result<()> {
        self.send_signal(Signal::Term).await
    }
}
