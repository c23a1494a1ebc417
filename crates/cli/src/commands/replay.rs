//! `stepstream replay`: fold a recorded delta stream.

use std::path::Path;

use stepstream_client::{StreamConsumer, StreamEnd};
use stepstream_config::AppConfig;
use stepstream_core::delta::Delta;
use tracing::{info, warn};

use super::sink::LogSink;

pub async fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let deltas = parse_lines(&content);
    info!(file = %file.display(), deltas = deltas.len(), "Replaying delta stream");

    let key = AppConfig::load()
        .map(|c| c.chat_history_key)
        .unwrap_or_else(|_| AppConfig::default().chat_history_key);
    let mut consumer = StreamConsumer::new(LogSink::new(key));
    let end = consumer.consume(futures::stream::iter(deltas)).await;

    let report = serde_json::json!({
        "end": match end {
            StreamEnd::Completed => "completed",
            StreamEnd::Interrupted => "interrupted",
        },
        "applied": consumer.applied(),
        "invalidations": consumer.sink().delivered,
        "state": consumer.state(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Decode one delta per non-blank line. Lines that do not decode are
/// skipped with a warning; they never reach the reducer.
pub fn parse_lines(content: &str) -> Vec<Delta> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match Delta::from_json(line) {
            Ok(delta) => Some(delta),
            Err(e) => {
                warn!(line = n + 1, error = %e, "Skipping undecodable delta");
                None
            }
        })
        .collect()
}
