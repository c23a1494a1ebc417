//! Per-kind artifact extensions.
//!
//! Some artifact kinds assemble their content from chunk deltas. The
//! extension for the current artifact's kind sees each artifact delta first;
//! the generic field fold then runs on its output.

use std::collections::HashMap;

use stepstream_core::artifact::{Artifact, ArtifactKind};
use stepstream_core::delta::{Delta, TextChunk};
use tracing::debug;

/// How an artifact kind assembles content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactExtension {
    /// `doc-text-delta` chunks are written at their character offset.
    TextAppend,
    /// `doc-code-delta` carries the whole content; the latest one wins.
    CodeSnapshot,
    /// Content deltas are ignored.
    Passive,
}

impl ArtifactExtension {
    /// Apply a delta's content to `artifact`. Deltas this extension does
    /// not handle leave it unchanged.
    pub fn apply(self, mut artifact: Artifact, delta: &Delta) -> Artifact {
        match (self, delta) {
            (Self::TextAppend, Delta::DocTextDelta(chunk)) => {
                match write_at(&artifact.content, chunk) {
                    Some(content) => artifact.content = content,
                    None => debug!(
                        offset = chunk.offset,
                        len = artifact.content.chars().count(),
                        "Dropping text chunk past the end of the document"
                    ),
                }
                artifact
            }
            (Self::CodeSnapshot, Delta::DocCodeDelta(snapshot)) => {
                artifact.content.clone_from(snapshot);
                artifact
            }
            _ => artifact,
        }
    }
}

/// Overwrite `content` with the chunk starting at its character offset.
///
/// Rewriting a chunk that is already in place yields the same content, so
/// redelivered chunks are no-ops. A chunk that would leave a gap is
/// rejected.
fn write_at(content: &str, chunk: &TextChunk) -> Option<String> {
    let chars: Vec<char> = content.chars().collect();
    if chunk.offset > chars.len() {
        return None;
    }
    let end = chunk.offset + chunk.text.chars().count();
    let mut out: String = chars[..chunk.offset].iter().collect();
    out.push_str(&chunk.text);
    if end < chars.len() {
        out.extend(&chars[end..]);
    }
    Some(out)
}

/// Which extension each artifact kind uses.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    entries: HashMap<ArtifactKind, ArtifactExtension>,
}

impl ExtensionTable {
    /// A table where every kind is passive.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Set the extension for one kind.
    pub fn with(mut self, kind: ArtifactKind, extension: ArtifactExtension) -> Self {
        self.entries.insert(kind, extension);
        self
    }

    /// The extension for `kind`; unregistered kinds are passive.
    pub fn lookup(&self, kind: ArtifactKind) -> ArtifactExtension {
        self.entries
            .get(&kind)
            .copied()
            .unwrap_or(ArtifactExtension::Passive)
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::empty()
            .with(ArtifactKind::Text, ArtifactExtension::TextAppend)
            .with(ArtifactKind::Code, ArtifactExtension::CodeSnapshot)
            .with(ArtifactKind::Sheet, ArtifactExtension::CodeSnapshot)
            .with(ArtifactKind::Image, ArtifactExtension::Passive)
    }
}
