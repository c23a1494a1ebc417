//! Document tool: drafts an artifact and streams it through `doc-*` deltas.
//!
//! The tool stages the document lifecycle (`doc-kind`, `doc-id`,
//! `doc-title`, `doc-clear`, content, `doc-finish`) on the run's document
//! draft. The agent loop flushes it when the run finalizes.

use async_trait::async_trait;
use stepstream_core::artifact::ArtifactKind;
use stepstream_core::delta::{Delta, TextChunk};
use stepstream_core::error::ToolError;
use stepstream_core::tool::{Tool, ToolContext, ToolResult};
use tracing::debug;
use uuid::Uuid;

/// Characters per `doc-text-delta` chunk.
const CHUNK_CHARS: usize = 24;

pub struct CreateDocumentTool;

#[async_trait]
impl Tool for CreateDocumentTool {
    fn name(&self) -> &str {
        "create_document"
    }

    fn description(&self) -> &str {
        "Create a document for writing or content creation activities. \
         The document is shown to the user alongside the chat."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "kind": {
                    "type": "string",
                    "enum": ["text", "code", "sheet"],
                    "default": "text"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let title = arguments["title"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'title' argument".into()))?;
        let kind = match arguments.get("kind") {
            None | Some(serde_json::Value::Null) => ArtifactKind::Text,
            Some(raw) => serde_json::from_value::<ArtifactKind>(raw.clone())
                .ok()
                .filter(|k| *k != ArtifactKind::Image)
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!("Unsupported document kind {raw}"))
                })?,
        };

        let id = Uuid::new_v4().to_string();
        let docs = &ctx.documents;
        docs.stage(Delta::DocKind(kind));
        docs.stage(Delta::DocId(id.clone()));
        docs.stage(Delta::DocTitle(title.to_string()));
        docs.stage(Delta::DocClear);

        let content = draft_content(title, kind);
        match kind {
            ArtifactKind::Text => {
                for chunk in chunk_text(&content, CHUNK_CHARS) {
                    docs.stage(Delta::DocTextDelta(chunk));
                }
            }
            _ => docs.stage(Delta::DocCodeDelta(content.clone())),
        }
        docs.stage(Delta::DocFinish);
        debug!(document_id = %id, staged = docs.len(), "Document staged");

        Ok(ToolResult::ok("A document was created and is now visible to the user.").with_data(
            serde_json::json!({
                "id": id,
                "title": title,
                "kind": kind,
            }),
        ))
    }
}

/// Placeholder content for a new document.
fn draft_content(title: &str, kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Code => format!(
            "// {title}\nfn main() {{\n    println!(\"{}\");\n}}\n",
            title.escape_default()
        ),
        ArtifactKind::Sheet => format!("item,notes\n\"{}\",\n", title.replace('"', "\"\"")),
        ArtifactKind::Text | ArtifactKind::Image => {
            format!("# {title}\n\nThis draft outlines {title}. Edit it to add detail.\n")
        }
    }
}

/// Split `text` into positional chunks of at most `size` characters.
fn chunk_text(text: &str, size: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .enumerate()
        .map(|(i, piece)| TextChunk {
            offset: i * size.max(1),
            text: piece.iter().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepstream_core::delta::kind;
    use stepstream_core::tool::DocumentDraft;

    async fn create(args: serde_json::Value) -> (Result<ToolResult, ToolError>, Vec<Delta>) {
        let draft = DocumentDraft::new();
        let ctx = ToolContext::new("inv-1", draft.clone());
        let result = CreateDocumentTool.execute(args, &ctx).await;
        (result, draft.drain())
    }

    #[tokio::test]
    async fn stages_text_document_lifecycle() {
        let (result, staged) = create(serde_json::json!({"title": "Trip notes"})).await;
        let result = result.unwrap();
        assert_eq!(result.data.as_ref().unwrap()["kind"], "text");

        let kinds: Vec<&str> = staged.iter().map(Delta::kind).collect();
        assert_eq!(&kinds[..4], &[kind::DOC_KIND, kind::DOC_ID, kind::DOC_TITLE, kind::DOC_CLEAR]);
        assert_eq!(kinds.last(), Some(&kind::DOC_FINISH));
        assert!(kinds.iter().any(|k| *k == kind::DOC_TEXT_DELTA));

        // Reassembling the chunks gives the whole draft.
        let mut content = String::new();
        for delta in &staged {
            if let Delta::DocTextDelta(chunk) = delta {
                assert_eq!(chunk.offset, content.chars().count());
                content.push_str(&chunk.text);
            }
        }
        assert_eq!(content, draft_content("Trip notes", ArtifactKind::Text));
    }

    #[tokio::test]
    async fn code_documents_use_snapshots() {
        let (result, staged) = create(serde_json::json!({"title": "hello", "kind": "code"})).await;
        assert!(result.is_ok());
        assert!(staged
            .iter()
            .any(|d| matches!(d, Delta::DocCodeDelta(code) if code.contains("fn main"))));
        assert!(!staged.iter().any(|d| d.kind() == kind::DOC_TEXT_DELTA));
    }

    #[tokio::test]
    async fn invalid_arguments_stage_nothing() {
        for args in [
            serde_json::json!({}),
            serde_json::json!({"title": "x", "kind": "image"}),
            serde_json::json!({"title": "x", "kind": "video"}),
        ] {
            let (result, staged) = create(args).await;
            assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
            assert!(staged.is_empty());
        }
    }

    #[test]
    fn chunks_are_positional() {
        let chunks = chunk_text("abcdefg", 3);
        let offsets: Vec<_> = chunks.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
        assert_eq!(chunks[2].text, "g");
    }
}
