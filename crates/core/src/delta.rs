//! The delta protocol: typed incremental state-change events.
//!
//! Every delta travels as `{ "kind": <string>, "data": <json> }`. The kind
//! discriminates the payload shape. Kinds this crate does not know are kept
//! as [`Delta::Unknown`] and passed through untouched, so producers can add
//! new kinds without breaking older consumers.
//!
//! Deltas carry no sequence number: within one run they are totally ordered
//! by arrival on a single channel.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::artifact::ArtifactKind;
use crate::error::DeltaError;
use crate::plan::{AgentPlan, StepStatus};
use crate::status::AgentStatus;

/// Wire names of every kind this crate understands.
pub mod kind {
    pub const PLAN_SET: &str = "plan-set";
    pub const STEP_PROGRESS: &str = "step-progress";
    pub const STATUS_SET: &str = "status-set";
    pub const DOC_ID: &str = "doc-id";
    pub const DOC_TITLE: &str = "doc-title";
    pub const DOC_KIND: &str = "doc-kind";
    pub const DOC_CLEAR: &str = "doc-clear";
    pub const DOC_FINISH: &str = "doc-finish";
    pub const DOC_TEXT_DELTA: &str = "doc-text-delta";
    pub const DOC_CODE_DELTA: &str = "doc-code-delta";
    pub const TEXT_DELTA: &str = "text-delta";
    pub const TOOL_START: &str = "tool-start";
    pub const TOOL_RESULT: &str = "tool-result";
    pub const TOOL_FAILED: &str = "tool-failed";
    pub const APPROVAL_REQUESTED: &str = "approval-requested";
    pub const APPROVAL_RESPONDED: &str = "approval-responded";
    pub const CHAT_TITLE: &str = "chat-title";
    pub const ERROR: &str = "error";
}

/// A human's answer to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// Payload of `step-progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    pub step_index: usize,
    pub status: StepStatus,
}

/// Payload of `doc-text-delta`: a chunk written at a known offset.
///
/// The offset counts characters from the start of the content, which makes
/// redelivered chunks detectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub offset: usize,
    pub text: String,
}

/// Payload of `tool-start` and `approval-requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub invocation_id: String,
    pub tool: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Payload of `tool-result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub invocation_id: String,
    pub tool: String,
    #[serde(default)]
    pub output: serde_json::Value,
}

/// Payload of `tool-failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub invocation_id: String,
    pub tool: String,
    pub error: String,
}

/// Payload of `approval-responded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub invocation_id: String,
    pub decision: ApprovalDecision,
}

/// One typed event in a run's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Replace the plan wholesale.
    PlanSet(AgentPlan),
    /// Update one plan step by position.
    StepProgress(StepProgress),
    /// Overwrite the agent status.
    StatusSet(AgentStatus),
    DocId(String),
    DocTitle(String),
    DocKind(ArtifactKind),
    DocClear,
    DocFinish,
    /// Text artifact content chunk.
    DocTextDelta(TextChunk),
    /// Full code artifact content so far.
    DocCodeDelta(String),
    /// Model text output.
    TextDelta(String),
    ToolStart(ToolInvocation),
    ToolResult(ToolOutcome),
    ToolFailed(ToolFailure),
    ApprovalRequested(ToolInvocation),
    ApprovalResponded(ApprovalResponse),
    /// The chat's title changed; cached chat lists are stale.
    ChatTitle(String),
    /// A fault inside the run, reported before its terminal status.
    Error(String),
    /// A kind this crate does not know, kept verbatim.
    Unknown {
        kind: String,
        data: serde_json::Value,
    },
}

/// The raw `{ kind, data }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDelta {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Delta {
    /// The wire kind of this delta.
    pub fn kind(&self) -> &str {
        match self {
            Self::PlanSet(_) => kind::PLAN_SET,
            Self::StepProgress(_) => kind::STEP_PROGRESS,
            Self::StatusSet(_) => kind::STATUS_SET,
            Self::DocId(_) => kind::DOC_ID,
            Self::DocTitle(_) => kind::DOC_TITLE,
            Self::DocKind(_) => kind::DOC_KIND,
            Self::DocClear => kind::DOC_CLEAR,
            Self::DocFinish => kind::DOC_FINISH,
            Self::DocTextDelta(_) => kind::DOC_TEXT_DELTA,
            Self::DocCodeDelta(_) => kind::DOC_CODE_DELTA,
            Self::TextDelta(_) => kind::TEXT_DELTA,
            Self::ToolStart(_) => kind::TOOL_START,
            Self::ToolResult(_) => kind::TOOL_RESULT,
            Self::ToolFailed(_) => kind::TOOL_FAILED,
            Self::ApprovalRequested(_) => kind::APPROVAL_REQUESTED,
            Self::ApprovalResponded(_) => kind::APPROVAL_RESPONDED,
            Self::ChatTitle(_) => kind::CHAT_TITLE,
            Self::Error(_) => kind::ERROR,
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Whether this delta affects the artifact slice.
    pub fn is_artifact_delta(&self) -> bool {
        matches!(
            self,
            Self::DocId(_)
                | Self::DocTitle(_)
                | Self::DocKind(_)
                | Self::DocClear
                | Self::DocFinish
                | Self::DocTextDelta(_)
                | Self::DocCodeDelta(_)
        )
    }

    /// Decode a raw envelope.
    ///
    /// Unknown kinds succeed as [`Delta::Unknown`]; a known kind whose
    /// payload does not match its shape is rejected.
    pub fn from_wire(wire: WireDelta) -> Result<Self, DeltaError> {
        let WireDelta { kind, data } = wire;
        let delta = match kind.as_str() {
            "" => return Err(DeltaError::MissingKind),
            kind::PLAN_SET => Self::PlanSet(payload(&kind, data)?),
            kind::STEP_PROGRESS => Self::StepProgress(payload(&kind, data)?),
            kind::STATUS_SET => Self::StatusSet(payload(&kind, data)?),
            kind::DOC_ID => Self::DocId(payload(&kind, data)?),
            kind::DOC_TITLE => Self::DocTitle(payload(&kind, data)?),
            kind::DOC_KIND => Self::DocKind(payload(&kind, data)?),
            kind::DOC_CLEAR => Self::DocClear,
            kind::DOC_FINISH => Self::DocFinish,
            kind::DOC_TEXT_DELTA => Self::DocTextDelta(payload(&kind, data)?),
            kind::DOC_CODE_DELTA => Self::DocCodeDelta(payload(&kind, data)?),
            kind::TEXT_DELTA => Self::TextDelta(payload(&kind, data)?),
            kind::TOOL_START => Self::ToolStart(payload(&kind, data)?),
            kind::TOOL_RESULT => Self::ToolResult(payload(&kind, data)?),
            kind::TOOL_FAILED => Self::ToolFailed(payload(&kind, data)?),
            kind::APPROVAL_REQUESTED => Self::ApprovalRequested(payload(&kind, data)?),
            kind::APPROVAL_RESPONDED => Self::ApprovalResponded(payload(&kind, data)?),
            kind::CHAT_TITLE => Self::ChatTitle(payload(&kind, data)?),
            kind::ERROR => Self::Error(payload(&kind, data)?),
            _ => Self::Unknown {
                kind: kind.clone(),
                data,
            },
        };
        Ok(delta)
    }

    /// Decode one JSON-encoded delta.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let wire: WireDelta = serde_json::from_str(json)?;
        Ok(Self::from_wire(wire)?)
    }

    /// The raw envelope for this delta.
    pub fn to_wire(&self) -> WireDelta {
        let data = serde_json::to_value(self)
            .ok()
            .and_then(|mut envelope| envelope.get_mut("data").map(serde_json::Value::take))
            .unwrap_or_default();
        WireDelta {
            kind: self.kind().to_string(),
            data,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, DeltaError> {
    serde_json::from_value(data).map_err(|e| DeltaError::MalformedPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

impl Serialize for Delta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("Delta", 2)?;
        envelope.serialize_field("kind", self.kind())?;
        match self {
            Self::PlanSet(plan) => envelope.serialize_field("data", plan)?,
            Self::StepProgress(progress) => envelope.serialize_field("data", progress)?,
            Self::StatusSet(status) => envelope.serialize_field("data", status)?,
            Self::DocId(s)
            | Self::DocTitle(s)
            | Self::DocCodeDelta(s)
            | Self::TextDelta(s)
            | Self::ChatTitle(s)
            | Self::Error(s) => envelope.serialize_field("data", s)?,
            Self::DocKind(kind) => envelope.serialize_field("data", kind)?,
            Self::DocClear | Self::DocFinish => envelope.serialize_field("data", &())?,
            Self::DocTextDelta(chunk) => envelope.serialize_field("data", chunk)?,
            Self::ToolStart(call) | Self::ApprovalRequested(call) => {
                envelope.serialize_field("data", call)?
            }
            Self::ToolResult(outcome) => envelope.serialize_field("data", outcome)?,
            Self::ToolFailed(failure) => envelope.serialize_field("data", failure)?,
            Self::ApprovalResponded(response) => envelope.serialize_field("data", response)?,
            Self::Unknown { data, .. } => envelope.serialize_field("data", data)?,
        }
        envelope.end()
    }
}

impl<'de> Deserialize<'de> for Delta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireDelta::deserialize(deserializer)?;
        Self::from_wire(wire).map_err(D::Error::custom)
    }
}
