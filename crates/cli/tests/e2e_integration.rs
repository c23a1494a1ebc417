//! End-to-end tests: agent loop → delta stream → client reducer.
//!
//! These exercise the full pipeline with a scripted model, the built-in
//! tools and the stream consumer, the same way a client would use them.

use std::io::Write;
use std::sync::Arc;

use stepstream_agent::{AgentLoop, GateSet, RunOutcome, ScriptedModel, ToolGate};
use stepstream_client::{CacheKey, InvalidationSink, SinkUnavailable, StreamConsumer, StreamEnd};
use stepstream_config::{AppConfig, ToolPolicyConfig};
use stepstream_core::artifact::ArtifactStatus;
use stepstream_core::delta::{ApprovalDecision, Delta, StepProgress, kind};
use stepstream_core::error::ToolError;
use stepstream_core::model::ModelReply;
use stepstream_core::plan::StepStatus;
use stepstream_core::status::AgentStatus;
use stepstream_core::tool::{Tool, ToolCall, ToolContext, ToolResult};
use stepstream_tools::default_gates;

// ── Helpers ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSink {
    seen: Vec<CacheKey>,
}

impl InvalidationSink for RecordingSink {
    fn invalidate(&mut self, key: &CacheKey) -> Result<(), SinkUnavailable> {
        self.seen.push(*key);
        Ok(())
    }
}

/// A tool that always succeeds.
struct NamedTool(&'static str);

#[async_trait::async_trait]
impl Tool for NamedTool {
    fn name(&self) -> &str {
        self.0
    }
    fn description(&self) -> &str {
        "Stub tool"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(format!("{} ok", self.0)))
    }
}

fn weather_report_model() -> ScriptedModel {
    ScriptedModel::new(vec![
        ModelReply::ToolCall {
            call: ToolCall::new("get_weather", serde_json::json!({"location": "Lisbon"})),
        },
        ModelReply::ToolCall {
            call: ToolCall::new(
                "create_document",
                serde_json::json!({"title": "Weather in Lisbon", "kind": "text"}),
            ),
        },
        ModelReply::Text {
            text: "Done.".into(),
        },
    ])
}

async fn collect(agent: &AgentLoop, prompt: &str) -> (Vec<Delta>, stepstream_agent::RunSummary) {
    agent.start(prompt).collect().await
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn weather_report_builds_plan_and_artifact() {
    let config = AppConfig::default();
    let agent = AgentLoop::from_config(
        Arc::new(weather_report_model()),
        Arc::new(default_gates(&config)),
        &config,
    );

    let (deltas, control) = agent.start("Weather in Lisbon, written up").into_parts();
    let mut consumer = StreamConsumer::new(RecordingSink::default());
    let end = consumer.consume_receiver(deltas).await;
    let summary = control.join().await;

    assert_eq!(end, StreamEnd::Completed);
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.tool_calls, 2);

    let state = consumer.state();
    assert_eq!(state.status, AgentStatus::Idle);
    let plan = state.plan.as_ref().expect("plan was set");
    assert_eq!(plan.steps.len(), 2);
    assert!(plan.steps.iter().all(|s| s.status == StepStatus::Done));

    let artifact = state.artifact.as_ref().expect("document was streamed");
    assert_eq!(artifact.title, "Weather in Lisbon");
    assert_eq!(artifact.status, ArtifactStatus::Idle);
    assert!(artifact.content.starts_with("# Weather in Lisbon"));
}

#[tokio::test]
async fn two_step_scenario_core_sequence() {
    let mut gates = GateSet::new();
    gates.register(ToolGate::new(Arc::new(NamedTool("A"))));
    gates.register(ToolGate::new(Arc::new(NamedTool("B"))));
    let agent = AgentLoop::new(
        Arc::new(ScriptedModel::tool_calls(&["A", "B"])),
        "You are helpful.",
        Arc::new(gates),
    )
    .with_max_steps(2);

    let (deltas, summary) = collect(&agent, "A then B").await;
    let core: Vec<&Delta> = deltas
        .iter()
        .filter(|d| matches!(d.kind(), kind::PLAN_SET | kind::STEP_PROGRESS | kind::STATUS_SET))
        .collect();

    let kinds: Vec<&str> = core.iter().map(|d| d.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            kind::STATUS_SET,
            kind::STATUS_SET,
            kind::PLAN_SET,
            kind::STATUS_SET,
            kind::STEP_PROGRESS,
            kind::STEP_PROGRESS,
            kind::STATUS_SET,
        ]
    );
    assert_eq!(core[0], &Delta::StatusSet(AgentStatus::Thinking));
    assert_eq!(core[1], &Delta::StatusSet(AgentStatus::Planning));
    assert_eq!(core[3], &Delta::StatusSet(AgentStatus::Executing));
    assert_eq!(
        core[5],
        &Delta::StepProgress(StepProgress {
            step_index: 1,
            status: StepStatus::Done
        })
    );
    assert_eq!(core[6], &Delta::StatusSet(AgentStatus::Idle));
    assert_eq!(summary.outcome, RunOutcome::Exhausted);
}

#[tokio::test]
async fn rejected_document_never_materializes() {
    let mut config = AppConfig::default();
    config.tools.insert(
        "create_document".into(),
        ToolPolicyConfig {
            requires_approval: true,
            timeout_secs: None,
        },
    );
    let agent = AgentLoop::from_config(
        Arc::new(weather_report_model()),
        Arc::new(default_gates(&config)),
        &config,
    );

    let (mut deltas, control) = agent.start("Weather, please").into_parts();
    let mut consumer = StreamConsumer::new(RecordingSink::default());
    // Answer approvals from the stream itself, as a client would.
    while let Some(delta) = deltas.recv().await {
        if let Delta::ApprovalRequested(request) = &delta {
            assert_eq!(request.tool, "create_document");
            assert!(control.respond(&request.invocation_id, ApprovalDecision::Reject));
        }
        consumer.apply(&delta);
    }
    assert_eq!(consumer.finish(), StreamEnd::Completed);

    let state = consumer.state();
    let plan = state.plan.as_ref().unwrap();
    assert_eq!(plan.steps[0].status, StepStatus::Done);
    assert_eq!(plan.steps[1].status, StepStatus::Failed);
    assert!(state.artifact.is_none());
    assert_eq!(control.join().await.outcome, RunOutcome::Completed);
}

#[tokio::test]
async fn truncated_stream_is_interrupted() {
    let config = AppConfig::default();
    let agent = AgentLoop::from_config(
        Arc::new(weather_report_model()),
        Arc::new(default_gates(&config)),
        &config,
    );
    let (deltas, _) = collect(&agent, "Weather").await;

    let cut = deltas
        .iter()
        .position(|d| d.kind() == kind::STEP_PROGRESS)
        .unwrap();
    let mut consumer = StreamConsumer::new(RecordingSink::default());
    let end = consumer
        .consume(futures::stream::iter(deltas[..=cut].to_vec()))
        .await;

    assert_eq!(end, StreamEnd::Interrupted);
    assert_eq!(consumer.state().status, AgentStatus::Executing);
}

#[tokio::test]
async fn redelivered_deltas_do_not_change_the_result() {
    let config = AppConfig::default();
    let agent = AgentLoop::from_config(
        Arc::new(weather_report_model()),
        Arc::new(default_gates(&config)),
        &config,
    );
    let (deltas, _) = collect(&agent, "Weather").await;

    let mut once = StreamConsumer::new(RecordingSink::default());
    once.consume(futures::stream::iter(deltas.clone())).await;

    let doubled: Vec<Delta> = deltas.iter().flat_map(|d| [d.clone(), d.clone()]).collect();
    let mut twice = StreamConsumer::new(RecordingSink::default());
    twice.consume(futures::stream::iter(doubled)).await;

    assert_eq!(once.state(), twice.state());
}

#[tokio::test]
async fn wire_round_trip_preserves_the_run() {
    let config = AppConfig::default();
    let agent = AgentLoop::from_config(
        Arc::new(weather_report_model()),
        Arc::new(default_gates(&config)),
        &config,
    );
    let (deltas, _) = collect(&agent, "Weather").await;

    let mut recorded: Vec<Delta> = deltas
        .iter()
        .map(|d| Delta::from_json(&serde_json::to_string(d).unwrap()).unwrap())
        .collect();
    recorded.push(Delta::ChatTitle("Lisbon weather".into()));

    let mut consumer = StreamConsumer::new(RecordingSink::default());
    let end = consumer.consume(futures::stream::iter(recorded)).await;
    assert_eq!(end, StreamEnd::Completed);
    assert_eq!(consumer.sink().seen, vec![CacheKey::ChatHistory]);
    assert!(consumer.state().artifact.is_some());
}

#[tokio::test]
async fn config_file_bounds_the_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_steps = 1").unwrap();
    let config = AppConfig::load_from(file.path()).unwrap();

    let agent = AgentLoop::from_config(
        Arc::new(weather_report_model()),
        Arc::new(default_gates(&config)),
        &config,
    );
    let (deltas, summary) = collect(&agent, "Weather").await;

    assert_eq!(summary.outcome, RunOutcome::Exhausted);
    assert_eq!(summary.steps_taken, 1);
    assert!(!deltas.iter().any(|d| d.is_artifact_delta()));
    assert_eq!(deltas.last(), Some(&Delta::StatusSet(AgentStatus::Idle)));
}
