use serde::{Deserialize, Serialize};

/// Jittered exponential backoff parameters for a reconnecting streaming
/// client (STT or TTS), grounded on the node client's own backoff policy
/// but reparameterized per spec §5 (STT: 250ms → 10s).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "d_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "d_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "d_backoff_factor")]
    pub backoff_factor: f64,
    /// 0 means retry indefinitely.
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: d_initial_delay_ms(),
            max_delay_ms: d_max_delay_ms(),
            backoff_factor: d_backoff_factor(),
            max_attempts: d_max_attempts(),
        }
    }
}

fn d_initial_delay_ms() -> u64 {
    250
}
fn d_max_delay_ms() -> u64 {
    10_000
}
fn d_backoff_factor() -> f64 {
    2.0
}
fn d_max_attempts() -> u32 {
    0
}
