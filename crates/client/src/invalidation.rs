//! Cache invalidation side channel.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A cached view that some delta makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    /// The paginated list of chats (titles change it)
    ChatHistory,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatHistory => "chat-history",
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sink could not take an invalidation right now.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalidation sink unavailable: {0}")]
pub struct SinkUnavailable(pub String);

/// Where invalidations go.
pub trait InvalidationSink {
    /// Invalidate one cache entry. An `Err` means "try again later".
    fn invalidate(&mut self, key: &CacheKey) -> Result<(), SinkUnavailable>;
}

impl<S: InvalidationSink + ?Sized> InvalidationSink for Box<S> {
    fn invalidate(&mut self, key: &CacheKey) -> Result<(), SinkUnavailable> {
        (**self).invalidate(key)
    }
}

/// Forwards invalidations over a bounded channel. A full or closed channel
/// reports the sink as unavailable.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<CacheKey>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<CacheKey>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CacheKey>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl InvalidationSink for ChannelSink {
    fn invalidate(&mut self, key: &CacheKey) -> Result<(), SinkUnavailable> {
        self.tx.try_send(*key).map_err(|e| match e {
            TrySendError::Full(_) => SinkUnavailable("channel full".into()),
            TrySendError::Closed(_) => SinkUnavailable("channel closed".into()),
        })
    }
}
