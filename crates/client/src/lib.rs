//! # StepStream Client
//!
//! The consuming side of a run's delta stream. [`fold`] turns one delta into
//! a new [`ClientState`] plus side effects, without touching its inputs;
//! [`StreamConsumer`] applies a whole stream in order and delivers the
//! effects.

pub mod consumer;
pub mod extension;
pub mod invalidation;
pub mod reducer;
pub mod state;

pub use consumer::{StreamConsumer, StreamEnd};
pub use extension::{ArtifactExtension, ExtensionTable};
pub use invalidation::{CacheKey, ChannelSink, InvalidationSink, SinkUnavailable};
pub use reducer::{Effect, Folded, fold};
pub use state::ClientState;
