//! Shared application state for the carrier WS endpoint (spec §4.8).
//!
//! Analogous to the teacher's `state::AppState` — one `Clone`-able struct
//! of `Arc`-wrapped dependencies threaded through axum's `State` extractor.

use std::sync::Arc;

use rc_domain::config::Config;
use rc_llm::LlmProvider;
use rc_session::SessionDeps;
use rc_tenant::TenantCache;

use crate::registry::CallRegistry;

#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub tenants: Arc<TenantCache>,
    pub session_deps: Arc<SessionDeps>,
    pub registry: Arc<CallRegistry>,
    pub stt_api_key: Arc<str>,
    pub tts_api_key: Arc<str>,
}

impl GatewayState {
    pub fn llm_provider(&self) -> Arc<dyn LlmProvider> {
        self.session_deps.provider.clone()
    }
}
