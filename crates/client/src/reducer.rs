//! The pure delta fold.

use stepstream_core::artifact::{Artifact, ArtifactStatus};
use stepstream_core::delta::Delta;

use crate::extension::ExtensionTable;
use crate::invalidation::CacheKey;
use crate::state::ClientState;

/// A side effect requested by a delta. The reducer never performs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Invalidate(CacheKey),
}

/// The result of folding one delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folded {
    pub state: ClientState,
    pub effects: Vec<Effect>,
}

impl Folded {
    fn unchanged(state: &ClientState) -> Self {
        Self::new(state.clone())
    }

    fn new(state: ClientState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

/// Fold one delta into a new state.
///
/// Neither `state` nor `delta` is modified. Folding the same delta twice in
/// a row gives the same state as folding it once. Deltas that reference a
/// missing plan or step, and kinds the client does not track, leave the
/// state as it was.
pub fn fold(state: &ClientState, delta: &Delta, extensions: &ExtensionTable) -> Folded {
    match delta {
        Delta::StatusSet(status) => Folded::new(ClientState {
            status: *status,
            ..state.clone()
        }),

        Delta::PlanSet(plan) => Folded::new(ClientState {
            plan: Some(plan.clone()),
            ..state.clone()
        }),

        Delta::StepProgress(progress) => {
            let updated = state
                .plan
                .as_ref()
                .and_then(|plan| plan.with_step_status(progress.step_index, progress.status));
            match updated {
                Some(plan) => Folded::new(ClientState {
                    plan: Some(plan),
                    ..state.clone()
                }),
                None => Folded::unchanged(state),
            }
        }

        Delta::ChatTitle(_) => Folded {
            state: state.clone(),
            effects: vec![Effect::Invalidate(CacheKey::ChatHistory)],
        },

        d if d.is_artifact_delta() => Folded::new(ClientState {
            artifact: Some(fold_artifact(state.artifact.as_ref(), d, extensions)),
            ..state.clone()
        }),

        _ => Folded::unchanged(state),
    }
}

fn fold_artifact(
    current: Option<&Artifact>,
    delta: &Delta,
    extensions: &ExtensionTable,
) -> Artifact {
    let base = current.cloned().unwrap_or_else(Artifact::streaming);
    let extended = extensions.lookup(base.kind).apply(base, delta);

    match delta {
        Delta::DocId(id) => Artifact {
            document_id: id.clone(),
            status: ArtifactStatus::Streaming,
            ..extended
        },
        Delta::DocTitle(title) => Artifact {
            title: title.clone(),
            status: ArtifactStatus::Streaming,
            ..extended
        },
        Delta::DocKind(kind) => Artifact {
            kind: *kind,
            status: ArtifactStatus::Streaming,
            ..extended
        },
        Delta::DocClear => Artifact {
            content: String::new(),
            status: ArtifactStatus::Streaming,
            ..extended
        },
        Delta::DocFinish => Artifact {
            status: ArtifactStatus::Idle,
            ..extended
        },
        _ => extended,
    }
}
