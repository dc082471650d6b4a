use serde::{Deserialize, Serialize};

/// Conversation-engine LLM provider configuration (spec §4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_endpoint")]
    pub endpoint: String,
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "d_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: d_endpoint(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            temperature: d_temperature(),
            max_tokens: d_max_tokens(),
            request_timeout_ms: d_request_timeout_ms(),
        }
    }
}

fn d_endpoint() -> String {
    "https://llm.example.invalid/v1/chat/completions".into()
}
fn d_api_key_env() -> String {
    "RC_LLM_API_KEY".into()
}
fn d_model() -> String {
    "gpt-4o-mini".into()
}
fn d_temperature() -> f32 {
    0.3
}
fn d_max_tokens() -> u32 {
    400
}
fn d_request_timeout_ms() -> u64 {
    8_000
}
