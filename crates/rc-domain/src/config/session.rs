use serde::{Deserialize, Serialize};

/// Call-session timing knobs owned by C7 (spec §4.7, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Grace window after `UtteranceEnd` before engine work starts
    /// (spec §4.7: 500ms).
    #[serde(default = "d_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum cleaned-transcript length during `AiSpeaking` that counts
    /// as barge-in (spec §4.7: length 6 triggers, 5 does not).
    #[serde(default = "d_barge_in_min_chars")]
    pub barge_in_min_chars: usize,
    /// No inbound AND no outbound audio for this long ends the call
    /// (spec §4.7, §5: 30s).
    #[serde(default = "d_idle_guard_secs")]
    pub idle_guard_secs: u64,
    /// Fail-safe absolute timeout after a farewell is detected, in case
    /// the TTS flush never completes (spec §4.7, §5: 8s).
    #[serde(default = "d_farewell_timeout_secs")]
    pub farewell_timeout_secs: u64,
    /// Explicit farewell phrases (not polite tokens) that trigger
    /// call-end heuristics when matched in the latest user turn.
    #[serde(default = "d_farewell_phrases")]
    pub farewell_phrases: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: d_debounce_ms(),
            barge_in_min_chars: d_barge_in_min_chars(),
            idle_guard_secs: d_idle_guard_secs(),
            farewell_timeout_secs: d_farewell_timeout_secs(),
            farewell_phrases: d_farewell_phrases(),
        }
    }
}

fn d_debounce_ms() -> u64 {
    500
}
fn d_barge_in_min_chars() -> usize {
    5
}
fn d_idle_guard_secs() -> u64 {
    30
}
fn d_farewell_timeout_secs() -> u64 {
    8
}
fn d_farewell_phrases() -> Vec<String> {
    [
        "bye",
        "goodbye",
        "that's all",
        "thats all",
        "nothing else",
        "that is all",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
