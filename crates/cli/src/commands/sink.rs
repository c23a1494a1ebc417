//! Invalidation sink used by the CLI.

use stepstream_client::{CacheKey, InvalidationSink, SinkUnavailable};
use tracing::info;

/// Logs each invalidation under its configured storage key.
pub struct LogSink {
    chat_history_key: String,
    pub delivered: usize,
}

impl LogSink {
    pub fn new(chat_history_key: impl Into<String>) -> Self {
        Self {
            chat_history_key: chat_history_key.into(),
            delivered: 0,
        }
    }

    fn storage_key(&self, key: &CacheKey) -> &str {
        match key {
            CacheKey::ChatHistory => &self.chat_history_key,
        }
    }
}

impl InvalidationSink for LogSink {
    fn invalidate(&mut self, key: &CacheKey) -> Result<(), SinkUnavailable> {
        info!(key = self.storage_key(key), "Cache invalidated");
        self.delivered += 1;
        Ok(())
    }
}
