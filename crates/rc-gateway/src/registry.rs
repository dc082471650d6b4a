//! In-memory registry of active calls (spec §4.8, C8).
//!
//! Grounded on the teacher's `nodes/registry.rs` — a `RwLock<HashMap<...>>`
//! keyed by connection id — repurposed here to key by carrier call id
//! instead of node id, plus the graceful-shutdown drain window from
//! `main.rs::run_server`'s shutdown handling.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// A call currently being served.
pub struct ActiveCall {
    pub call_id: String,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    /// Cancelled to tear the call down during shutdown.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallInfo {
    pub call_id: String,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
}

pub struct CallRegistry {
    calls: RwLock<HashMap<String, ActiveCall>>,
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRegistry {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, call: ActiveCall) {
        tracing::info!(call_id = %call.call_id, tenant_id = %call.tenant_id, "call registered");
        self.calls.write().insert(call.call_id.clone(), call);
    }

    pub fn remove(&self, call_id: &str) {
        if self.calls.write().remove(call_id).is_some() {
            tracing::info!(call_id = %call_id, "call removed");
        }
    }

    pub fn list(&self) -> Vec<CallInfo> {
        self.calls
            .read()
            .values()
            .map(|c| CallInfo {
                call_id: c.call_id.clone(),
                tenant_id: c.tenant_id.clone(),
                started_at: c.started_at,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.read().is_empty()
    }

    /// Cancel every active call's shutdown token, then poll until the
    /// registry drains or `drain.` elapses (spec §5, §4.8's graceful-drain
    /// shutdown window).
    pub async fn shutdown(&self, drain: Duration) {
        let tokens: Vec<CancellationToken> = self
            .calls
            .read()
            .values()
            .map(|c| c.shutdown.clone())
            .collect();
        tracing::info!(active = tokens.len(), drain_secs = drain.as_secs(), "shutting down active calls");
        for token in &tokens {
            token.cancel();
        }

        let deadline = tokio::time::Instant::now() + drain;
        while !self.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if !self.is_empty() {
            tracing::warn!(remaining = self.len(), "drain window elapsed, calls still active");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ActiveCall {
        ActiveCall {
            call_id: id.into(),
            tenant_id: "acme".into(),
            started_at: Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }

    #[test]
    fn register_then_list_then_remove() {
        let reg = CallRegistry::new();
        reg.register(call("call-1"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.list()[0].call_id, "call-1");
        reg.remove("call-1");
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn shutdown_cancels_tokens_and_waits_for_drain() {
        let reg = CallRegistry::new();
        let token = CancellationToken::new();
        reg.register(ActiveCall {
            call_id: "call-1".into(),
            tenant_id: "acme".into(),
            started_at: Utc::now(),
            shutdown: token.clone(),
        });

        let reg_for_drain = &reg;
        tokio::spawn(async move {
            token.cancelled().await;
        });
        // Nothing removes the call from the registry on its own in this
        // test (no session task actually running), so the drain window
        // should elapse and log a warning rather than hang forever.
        reg_for_drain.shutdown(Duration::from_millis(50)).await;
        assert_eq!(reg.len(), 1);
    }
}
