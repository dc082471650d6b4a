use serde::{Deserialize, Serialize};

use super::ReconnectConfig;

/// TTS provider configuration (spec §4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "d_endpoint")]
    pub endpoint: String,
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Flush when the buffered fragment reaches this many characters, even
    /// without sentence punctuation (spec §4.3: 50).
    #[serde(default = "d_max_buffer_chars")]
    pub max_buffer_chars: usize,
    /// A comma only triggers a flush once at least this many characters
    /// are buffered (spec §4.3: 10).
    #[serde(default = "d_min_comma_chars")]
    pub min_comma_chars: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: d_endpoint(),
            api_key_env: d_api_key_env(),
            sample_rate: d_sample_rate(),
            reconnect: ReconnectConfig::default(),
            max_buffer_chars: d_max_buffer_chars(),
            min_comma_chars: d_min_comma_chars(),
        }
    }
}

fn d_endpoint() -> String {
    "wss://tts.example.invalid/v1/speak".into()
}
fn d_api_key_env() -> String {
    "RC_TTS_API_KEY".into()
}
fn d_sample_rate() -> u32 {
    8_000
}
fn d_max_buffer_chars() -> usize {
    50
}
fn d_min_comma_chars() -> usize {
    10
}
