//! Per-call cancellation registry (spec §4.7: barge-in cancels the
//! in-flight engine run).
//!
//! Grounded on the teacher's session cancel map, simplified for this
//! spec: one call never owns a tree of child runs the way the teacher's
//! agent groups do, so the group/cascade bookkeeping is dropped. The
//! per-entry token is a [`CancellationToken`] rather than an `AtomicBool`
//! so it composes directly with the `select!`-driven cancellation already
//! used by `rc-stt`, `rc-tts`, and `rc-engine`.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token for a call's next engine run, cancelling
    /// and replacing whatever token (if any) was registered before — a
    /// new turn always starts from a clean cancellation state.
    pub fn register(&self, call_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let mut tokens = self.tokens.lock();
        if let Some(old) = tokens.insert(call_id.to_owned(), token.clone()) {
            old.cancel();
        }
        token
    }

    /// Cancel the call's in-flight run, if any. Returns `true` if a token
    /// was found (not necessarily still un-cancelled).
    pub fn cancel(&self, call_id: &str) -> bool {
        match self.tokens.lock().get(call_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, call_id: &str) -> bool {
        self.tokens
            .lock()
            .get(call_id)
            .map(|t| !t.is_cancelled())
            .unwrap_or(false)
    }

    pub fn remove(&self, call_id: &str) {
        self.tokens.lock().remove(call_id);
    }
}
