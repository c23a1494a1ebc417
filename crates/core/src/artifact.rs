//! Generated-document artifacts assembled from `doc-*` deltas.

use serde::{Deserialize, Serialize};

/// The kind of document an artifact holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    #[default]
    Text,
    Code,
    Image,
    Sheet,
}

/// Whether the artifact is still receiving content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    #[default]
    Idle,
    Streaming,
}

/// An incrementally assembled document, distinct from chat text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub document_id: String,
    pub title: String,
    pub kind: ArtifactKind,
    pub content: String,
    pub status: ArtifactStatus,
}

impl Artifact {
    /// The record the first `doc-*` delta materializes.
    pub fn streaming() -> Self {
        Self {
            status: ArtifactStatus::Streaming,
            ..Self::default()
        }
    }
}
