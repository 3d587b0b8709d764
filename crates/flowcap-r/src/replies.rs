use flowcap_engine::router::Responder;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Responders waiting on the shim, keyed by the `reply_id` sent along with
/// the outgoing frame.
///
/// Connection tasks resolve replies directly, so a session blocked on a
/// reply never has to read its own frame queue to get unblocked.
#[derive(Clone, Default)]
pub struct PendingReplies {
    next_id: Arc<AtomicU64>,
    waiting: Arc<Mutex<HashMap<u64, Responder>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, responder: Responder) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut waiting) = self.waiting.lock() {
            waiting.insert(id, responder);
        }
        id
    }

    /// Runs the responder registered under `reply_id`. Returns `false` for
    /// unknown or already answered ids.
    pub fn resolve(&self, reply_id: u64, value: Value) -> bool {
        match self.take(reply_id) {
            Some(responder) => {
                responder(value);
                true
            }
            None => {
                debug!(reply_id, "reply for an id nobody waits on");
                false
            }
        }
    }

    /// Drops the responder unanswered.
    pub fn cancel(&self, reply_id: u64) -> bool {
        self.take(reply_id).is_some()
    }

    pub fn cancel_all(&self) -> usize {
        match self.waiting.lock() {
            Ok(mut waiting) => waiting.drain().count(),
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.waiting.lock().map(|w| w.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, reply_id: u64) -> Option<Responder> {
        self.waiting.lock().ok()?.remove(&reply_id)
    }
}
