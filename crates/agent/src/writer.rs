//! The producing end of a run's delta channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stepstream_core::delta::Delta;
use tokio::sync::mpsc;
use tracing::debug;

/// Sends deltas for one run, in order, on a single channel.
///
/// A dropped receiver is not an error for the run: the loop keeps going and
/// still settles every step, the deltas simply go nowhere. The drop is
/// logged once per run.
#[derive(Debug, Clone)]
pub struct DeltaWriter {
    tx: mpsc::Sender<Delta>,
    reported_closed: Arc<AtomicBool>,
}

impl DeltaWriter {
    pub fn new(tx: mpsc::Sender<Delta>) -> Self {
        Self {
            tx,
            reported_closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a writer and the receiver its deltas arrive on.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Delta>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Send one delta, waiting for channel capacity.
    pub async fn emit(&self, delta: Delta) {
        if let Err(mpsc::error::SendError(delta)) = self.tx.send(delta).await {
            if !self.reported_closed.swap(true, Ordering::Relaxed) {
                debug!(kind = delta.kind(), "Delta receiver dropped, discarding further deltas");
            }
        }
    }

    /// Whether a send has already found the receiver gone.
    pub fn has_reported_closed(&self) -> bool {
        self.reported_closed.load(Ordering::Relaxed)
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
