use serde::{Deserialize, Serialize};

/// Defaults for `ToolPolicy` where a tenant snapshot doesn't override them
/// (spec §4.5, §4.6, §6), plus the router's own bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "d_max_calls_per_turn")]
    pub max_calls_per_turn: u32,
    #[serde(default = "d_per_tool_timeout_ms")]
    pub per_tool_timeout_ms: u64,
    #[serde(default = "d_total_tool_budget_ms")]
    pub total_tool_budget_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_calls_per_turn: d_max_calls_per_turn(),
            per_tool_timeout_ms: d_per_tool_timeout_ms(),
            total_tool_budget_ms: d_total_tool_budget_ms(),
        }
    }
}

fn d_max_calls_per_turn() -> u32 {
    2
}
fn d_per_tool_timeout_ms() -> u64 {
    400
}
fn d_total_tool_budget_ms() -> u64 {
    1_000
}
