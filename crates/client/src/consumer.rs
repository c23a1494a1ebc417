//! Applies a delta stream in arrival order and delivers its side effects.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};
use stepstream_core::delta::Delta;
use tracing::{debug, warn};

use crate::extension::ExtensionTable;
use crate::invalidation::{CacheKey, InvalidationSink};
use crate::reducer::{Effect, fold};
use crate::state::ClientState;

/// How a delta stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The last `status-set` seen was `idle`.
    Completed,
    /// The stream stopped without a terminal status; the run may still be
    /// going or may have died. Callers can offer a retry.
    Interrupted,
}

/// One consumer per stream. Keeps the latest snapshot and routes cache
/// invalidations to a sink, holding them back while the sink is
/// unavailable.
pub struct StreamConsumer<S> {
    state: ClientState,
    extensions: ExtensionTable,
    sink: S,
    deferred: VecDeque<CacheKey>,
    applied: usize,
    ended_idle: bool,
}

impl<S: InvalidationSink> StreamConsumer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: ClientState::new(),
            extensions: ExtensionTable::default(),
            sink,
            deferred: VecDeque::new(),
            applied: 0,
            ended_idle: false,
        }
    }

    pub fn with_extensions(mut self, extensions: ExtensionTable) -> Self {
        self.extensions = extensions;
        self
    }

    /// The latest snapshot.
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Number of deltas applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Invalidations still waiting for the sink.
    pub fn pending_invalidations(&self) -> usize {
        self.deferred.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Apply one delta and return the new snapshot. Deferred invalidations
    /// are retried first.
    pub fn apply(&mut self, delta: &Delta) -> &ClientState {
        let folded = fold(&self.state, delta, &self.extensions);
        self.state = folded.state;
        self.applied += 1;
        if let Delta::StatusSet(status) = delta {
            self.ended_idle = status.is_terminal();
        }
        for effect in folded.effects {
            match effect {
                Effect::Invalidate(key) => self.deferred.push_back(key),
            }
        }
        self.flush();
        &self.state
    }

    /// Try to deliver every deferred invalidation, oldest first. Returns
    /// how many were delivered.
    pub fn flush(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(key) = self.deferred.front() {
            match self.sink.invalidate(key) {
                Ok(()) => {
                    self.deferred.pop_front();
                    delivered += 1;
                }
                Err(e) => {
                    debug!(
                        key = %key,
                        pending = self.deferred.len(),
                        error = %e,
                        "Deferring invalidation"
                    );
                    break;
                }
            }
        }
        delivered
    }

    /// Classify the end of the stream. Call once the stream is exhausted.
    pub fn finish(&mut self) -> StreamEnd {
        self.flush();
        if self.ended_idle {
            StreamEnd::Completed
        } else {
            warn!(
                status = %self.state.status,
                applied = self.applied,
                "Delta stream ended without a terminal status"
            );
            StreamEnd::Interrupted
        }
    }

    /// Apply every delta from `stream`, then [`finish`](Self::finish).
    pub async fn consume<St>(&mut self, stream: St) -> StreamEnd
    where
        St: Stream<Item = Delta>,
    {
        futures::pin_mut!(stream);
        while let Some(delta) = stream.next().await {
            self.apply(&delta);
        }
        self.finish()
    }

    /// Consume a run's delta receiver.
    pub async fn consume_receiver(
        &mut self,
        mut deltas: tokio::sync::mpsc::Receiver<Delta>,
    ) -> StreamEnd {
        while let Some(delta) = deltas.recv().await {
            self.apply(&delta);
        }
        self.finish()
    }

    pub fn into_state(self) -> ClientState {
        self.state
    }
}
