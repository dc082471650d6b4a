use serde::{Deserialize, Serialize};

use super::ReconnectConfig;

/// STT provider configuration (spec §4.2, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Streaming STT WebSocket endpoint (`wss://...`).
    #[serde(default = "d_endpoint")]
    pub endpoint: String,
    /// Env var holding the provider API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_language")]
    pub language: String,
    #[serde(default = "d_sample_rate")]
    pub sample_rate: u32,
    /// Milliseconds of trailing silence after which the provider emits
    /// `UtteranceEnd` (spec §4.2: 2000ms).
    #[serde(default = "d_utterance_end_ms")]
    pub utterance_end_ms: u64,
    /// Endpoint-silence threshold in ms (spec §4.2: 2500ms — the minimum
    /// that preserves natural thinking pauses while keeping latency
    /// acceptable once debouncing is applied).
    #[serde(default = "d_endpointing_ms")]
    pub endpointing_ms: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Max audio frames buffered while STT is disconnected, beyond which
    /// frames are dropped and counted (spec §4.2).
    #[serde(default = "d_buffer_frames")]
    pub buffered_frame_limit: usize,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: d_endpoint(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            language: d_language(),
            sample_rate: d_sample_rate(),
            utterance_end_ms: d_utterance_end_ms(),
            endpointing_ms: d_endpointing_ms(),
            reconnect: ReconnectConfig::default(),
            buffered_frame_limit: d_buffer_frames(),
        }
    }
}

fn d_endpoint() -> String {
    "wss://stt.example.invalid/v1/listen".into()
}
fn d_api_key_env() -> String {
    "RC_STT_API_KEY".into()
}
fn d_model() -> String {
    "nova-2".into()
}
fn d_language() -> String {
    "en-US".into()
}
fn d_sample_rate() -> u32 {
    8_000
}
fn d_utterance_end_ms() -> u64 {
    2_000
}
fn d_endpointing_ms() -> u64 {
    2_500
}
fn d_buffer_frames() -> usize {
    250 // ~5s of 20ms frames
}
