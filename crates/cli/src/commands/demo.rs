//! `stepstream demo`: run a scripted agent against the built-in tools.
//!
//! Prints every delta as a JSON line, answers approval requests as they
//! arrive, and finishes with the reducer's final snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use stepstream_agent::{AgentLoop, RunControl, ScriptedModel};
use stepstream_client::{StreamConsumer, StreamEnd};
use stepstream_config::AppConfig;
use stepstream_core::delta::{ApprovalDecision, Delta};
use stepstream_core::model::ModelReply;
use stepstream_core::tool::ToolCall;
use stepstream_tools::default_gates;
use tokio::sync::mpsc;
use tracing::info;

use super::sink::LogSink;

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// What to ask the agent
    #[arg(short, long, default_value = "What's the weather in Lisbon? Write it up for me.")]
    pub prompt: String,

    /// Location the scripted model asks the weather for
    #[arg(long, default_value = "Lisbon")]
    pub location: String,

    /// Override the configured step budget
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Require approval for this tool (repeatable)
    #[arg(long = "gate", value_name = "TOOL")]
    pub gated: Vec<String>,

    /// Reject every approval request instead of approving it
    #[arg(long)]
    pub reject: bool,

    /// Read configuration from this file instead of ~/.stepstream/config.toml
    #[arg(long, env = "STEPSTREAM_CONFIG")]
    pub config: Option<PathBuf>,
}

pub async fn run(args: DemoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps.max(1);
    }
    for tool in &args.gated {
        config.tools.entry(tool.clone()).or_default().requires_approval = true;
    }

    let agent = AgentLoop::from_config(
        Arc::new(scripted_model(&args.location)),
        Arc::new(default_gates(&config)),
        &config,
    );
    let decision = if args.reject {
        ApprovalDecision::Reject
    } else {
        ApprovalDecision::Approve
    };

    let (deltas, control) = agent.start(args.prompt.as_str()).into_parts();
    info!(run_id = control.run_id(), "Demo run started");

    let mut consumer = StreamConsumer::new(LogSink::new(config.chat_history_key.clone()));
    let end = pump(deltas, &control, &mut consumer, decision).await?;
    let summary = control.join().await;

    let report = serde_json::json!({
        "end": match end {
            StreamEnd::Completed => "completed",
            StreamEnd::Interrupted => "interrupted",
        },
        "summary": summary,
        "state": consumer.state(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// The demo script: check the weather, write it up, answer.
fn scripted_model(location: &str) -> ScriptedModel {
    ScriptedModel::new(vec![
        ModelReply::ToolCall {
            call: ToolCall::new("get_weather", serde_json::json!({ "location": location })),
        },
        ModelReply::ToolCall {
            call: ToolCall::new(
                "create_document",
                serde_json::json!({ "title": format!("Weather in {location}"), "kind": "text" }),
            ),
        },
        ModelReply::Text {
            text: format!("Here is the weather report for {location}."),
        },
    ])
}

/// Print and fold deltas until the run closes its stream, answering
/// approval requests with `decision` as they arrive.
async fn pump(
    mut deltas: mpsc::Receiver<Delta>,
    control: &RunControl,
    consumer: &mut StreamConsumer<LogSink>,
    decision: ApprovalDecision,
) -> Result<StreamEnd, serde_json::Error> {
    while let Some(delta) = deltas.recv().await {
        println!("{}", serde_json::to_string(&delta)?);
        if let Delta::ApprovalRequested(request) = &delta {
            info!(tool = %request.tool, ?decision, "Answering approval request");
            control.respond(&request.invocation_id, decision);
        }
        consumer.apply(&delta);
    }
    Ok(consumer.finish())
}
