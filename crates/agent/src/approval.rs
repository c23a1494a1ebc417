//! Human approval of gated tool invocations.
//!
//! A gate that needs approval registers the invocation here and awaits a
//! oneshot answer, so a suspended run holds no thread. Whoever drives the
//! run answers through [`ApprovalBroker::respond`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use stepstream_core::delta::ApprovalDecision;
use tokio::sync::oneshot;
use tracing::{debug, info};

type Pending = HashMap<String, oneshot::Sender<ApprovalDecision>>;

/// Pending approval requests for one run, keyed by invocation ID.
#[derive(Debug, Clone, Default)]
pub struct ApprovalBroker {
    pending: Arc<Mutex<Pending>>,
}

impl ApprovalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an approval request and return the receiver its answer arrives on.
    pub fn register(&self, invocation_id: &str) -> oneshot::Receiver<ApprovalDecision> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(invocation_id.to_string(), tx);
        debug!(invocation_id, "Approval request registered");
        rx
    }

    /// Answer a pending request.
    ///
    /// Only the first answer per invocation is accepted. Returns `false` for
    /// duplicates and for invocations that are not waiting.
    pub fn respond(&self, invocation_id: &str, decision: ApprovalDecision) -> bool {
        let Some(tx) = self.lock().remove(invocation_id) else {
            debug!(invocation_id, "Ignoring approval response with no pending request");
            return false;
        };
        info!(invocation_id, ?decision, "Approval response received");
        tx.send(decision).is_ok()
    }

    /// Drop a pending request without answering it.
    pub fn withdraw(&self, invocation_id: &str) {
        self.lock().remove(invocation_id);
    }

    pub fn is_pending(&self, invocation_id: &str) -> bool {
        self.lock().contains_key(invocation_id)
    }

    /// IDs of every invocation waiting for an answer.
    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_response_wins() {
        let broker = ApprovalBroker::new();
        let rx = broker.register("inv-1");
        assert!(broker.is_pending("inv-1"));

        assert!(broker.respond("inv-1", ApprovalDecision::Reject));
        assert!(!broker.respond("inv-1", ApprovalDecision::Approve));
        assert_eq!(rx.await.unwrap(), ApprovalDecision::Reject);
        assert!(!broker.is_pending("inv-1"));
    }

    #[test]
    fn unknown_invocation_is_ignored() {
        let broker = ApprovalBroker::new();
        assert!(!broker.respond("nope", ApprovalDecision::Approve));
    }

    #[test]
    fn withdraw_closes_the_request() {
        let broker = ApprovalBroker::new();
        let _rx = broker.register("inv-2");
        broker.withdraw("inv-2");
        assert!(broker.pending_ids().is_empty());
        assert!(!broker.respond("inv-2", ApprovalDecision::Approve));
    }

    #[test]
    fn clones_share_requests() {
        let broker = ApprovalBroker::new();
        let _rx = broker.register("b");
        let _rx2 = broker.clone().register("a");
        assert_eq!(broker.pending_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
