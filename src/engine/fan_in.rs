//! First-observed-wins error fan-in
//!
//! Every watcher in a pipeline holds a clone of [`ErrorFanIn`]. The first
//! report resolves the shared one-shot cell and cancels the pipeline; later
//! reports are dropped. When every clone is gone without a report, the
//! receiver resolves as closed, which is how the output stream learns that
//! all stages settled cleanly.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GififyError;

/// Receiving side of the fan-in
pub type FirstError = oneshot::Receiver<GififyError>;

#[derive(Clone)]
pub struct ErrorFanIn {
    slot: Arc<Mutex<Option<oneshot::Sender<GififyError>>>>,
    cancel: CancellationToken,
}

impl ErrorFanIn {
    /// Create a fan-in that cancels `cancel` on the first report
    pub fn new(cancel: CancellationToken) -> (Self, FirstError) {
        let (tx, rx) = oneshot::channel();
        let fan_in = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
            cancel,
        };
        (fan_in, rx)
    }

    /// Report a failure; returns whether it was the first one
    pub fn report(&self, err: GififyError) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match sender {
            Some(tx) => {
                warn!(error = %err, "Pipeline failed");
                // The stream may already be gone; the cancel still matters
                let _ = tx.send(err);
                self.cancel.cancel();
                true
            }
            None => {
                debug!(error = %err, "Ignoring error after the first");
                false
            }
        }
    }

    /// Whether an error has already been reported
    pub fn is_resolved(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_none())
            .unwrap_or(true)
    }

    /// Token cancelled by the first report
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
