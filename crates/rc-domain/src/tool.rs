use serde::{Deserialize, Serialize};

/// Internal tool call format (provider-agnostic).
/// Every LLM adapter converts provider-specific tool calls to/from this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Outcome of dispatching a tool call, attached to the turn that triggered
/// it for audit (spec §3, "Tool call record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub outcome: ToolOutcome,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ToolOutcome {
    #[serde(rename = "ok")]
    Ok { payload: serde_json::Value },
    #[serde(rename = "error")]
    Error { tag: ToolErrorTag, message: String },
    #[serde(rename = "timeout")]
    Timeout,
}

/// Error taxonomy for tool outcomes (spec §4.5 / §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorTag {
    SchemaError,
    NotFound,
    Empty,
    Upstream,
}
