//! The call orchestrator's data model (spec §3): tenant snapshots,
//! conversation turns, and turn-state — the types shared by every
//! component that touches a call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::tool::ToolCallRecord;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tenant snapshot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Immutable view of a tenant's configuration at the moment it was
/// resolved for a call (spec §3, "Tenant snapshot"). Once returned from
/// `rc-tenant`, a snapshot is never mutated; a refresh produces a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub tenant_id: String,
    pub display_name: String,
    pub industry: String,
    pub language: String,
    pub tone: String,
    pub dialed_number: String,
    pub greeting: Greeting,
    pub voice: VoiceConfig,
    /// Template variables substituted into the system-prompt template.
    pub prompt_vars: std::collections::HashMap<String, String>,
    pub tool_policy: ToolPolicy,
    /// Tenant-scoped read-only collections the tool catalogue serves from
    /// (spec §3, §4.5) — never written by the call core itself.
    pub services: Vec<ServiceEntry>,
    pub working_hours: Vec<WorkingHoursEntry>,
    /// Policy text keyed by topic (e.g. "cancellation").
    pub policies: std::collections::HashMap<String, String>,
    /// FAQ answer keyed by topic.
    pub faqs: std::collections::HashMap<String, String>,
    pub bookings: Vec<BookingRecord>,
    /// Whether this snapshot is the degraded generic fallback for an
    /// unresolved tenant key (spec §4.9 / §7 `TenantUnknown`).
    pub is_generic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub duration_minutes: u32,
    pub price_cents: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHoursEntry {
    /// "mon".."sun"
    pub day: String,
    pub opens: String,
    pub closes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking_id: String,
    pub customer_phone: String,
    pub service: String,
    pub starts_at: DateTime<Utc>,
    pub status: String,
}

impl TenantSnapshot {
    /// The safe, degraded snapshot used when the dialed number or
    /// session parameter does not resolve to a known tenant.
    pub fn generic() -> Self {
        Self {
            tenant_id: "unknown".into(),
            display_name: "our office".into(),
            industry: "general".into(),
            language: "en".into(),
            tone: "neutral".into(),
            dialed_number: String::new(),
            greeting: Greeting::Text(
                "Thanks for calling. How can I help you today?".into(),
            ),
            voice: VoiceConfig::default(),
            prompt_vars: std::collections::HashMap::new(),
            tool_policy: ToolPolicy::default(),
            services: Vec::new(),
            working_hours: Vec::new(),
            policies: std::collections::HashMap::new(),
            faqs: std::collections::HashMap::new(),
            bookings: Vec::new(),
            is_generic: true,
        }
    }
}

/// Either a pre-rendered greeting audio reference (played directly through
/// C1 without a TTS round-trip) or greeting text to synthesize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Greeting {
    Text(String),
    AudioRef(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
    pub sample_rate: u32,
    pub encoding: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            provider: "generic".into(),
            voice_id: "default".into(),
            sample_rate: 8_000,
            encoding: "mulaw".into(),
        }
    }
}

/// Tool-policy limits enforced by the conversation engine and tool router
/// (spec §4.5 / §4.6 / §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToolPolicy {
    pub max_calls_per_turn: u32,
    pub per_tool_timeout: Duration,
    pub total_tool_budget: Duration,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            max_calls_per_turn: 2,
            per_tool_timeout: Duration::from_millis(400),
            total_tool_budget: Duration::from_secs(1),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    ToolResult,
}

/// One contiguous contribution to the conversation (spec §3 / GLOSSARY).
/// The history is append-only within a call; a sealed turn is never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub seq: u64,
    pub role: TurnRole,
    pub content: String,
    /// Tool calls this turn triggered (assistant turns only).
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    pub timestamp: DateTime<Utc>,
    /// Set when an `AISpeaking` turn was cut short by barge-in (spec §9
    /// Open Question 1 — we commit interrupted turns rather than drop
    /// them, uniformly).
    #[serde(default)]
    pub interrupted: bool,
}

impl ConversationTurn {
    pub fn to_message(&self) -> Message {
        match self.role {
            TurnRole::System => Message::system(&self.content),
            TurnRole::User => Message::user(&self.content),
            TurnRole::Assistant => Message::assistant(&self.content),
            TurnRole::ToolResult => Message::tool_result("history", &self.content),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn-state machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The call session's turn-state machine (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    UserSpeaking,
    Thinking,
    AiSpeaking,
    Ending,
}

impl TurnState {
    /// `Ending` is enterable from any state and absorbing (spec §4.7).
    pub fn can_transition_to(self, next: TurnState) -> bool {
        if self == TurnState::Ending {
            return next == TurnState::Ending;
        }
        if next == TurnState::Ending {
            return true;
        }
        matches!(
            (self, next),
            (TurnState::AiSpeaking, TurnState::Idle)
                | (TurnState::Idle, TurnState::UserSpeaking)
                | (TurnState::Idle, TurnState::AiSpeaking) // greeting emitted
                | (TurnState::UserSpeaking, TurnState::Thinking)
                | (TurnState::Thinking, TurnState::AiSpeaking)
                | (TurnState::AiSpeaking, TurnState::UserSpeaking) // barge-in
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call metrics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-call timing and counters (spec §3), updated in place for the
/// lifetime of the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallMetrics {
    pub first_audio_in_ms: Option<u64>,
    pub first_transcript_ms: Option<u64>,
    pub first_llm_token_ms: Option<u64>,
    pub first_tts_audio_ms: Option<u64>,
    pub tool_call_count: u32,
    pub barge_in_count: u32,
    pub stt_reconnect_count: u32,
    pub tts_reconnect_count: u32,
    pub audio_bytes_in: u64,
    pub audio_bytes_out: u64,
    pub booking_writes: u32,
    pub sms_sends: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ending_is_absorbing() {
        assert!(TurnState::Idle.can_transition_to(TurnState::Ending));
        assert!(!TurnState::Ending.can_transition_to(TurnState::Idle));
        assert!(TurnState::Ending.can_transition_to(TurnState::Ending));
    }

    #[test]
    fn barge_in_transition_allowed() {
        assert!(TurnState::AiSpeaking.can_transition_to(TurnState::UserSpeaking));
    }

    #[test]
    fn greeting_transition_from_idle_allowed() {
        assert!(TurnState::Idle.can_transition_to(TurnState::AiSpeaking));
    }

    #[test]
    fn generic_snapshot_is_marked() {
        let snap = TenantSnapshot::generic();
        assert!(snap.is_generic);
        assert_eq!(snap.tool_policy.max_calls_per_turn, 2);
    }
}
