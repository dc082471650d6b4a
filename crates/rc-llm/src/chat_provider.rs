//! An OpenAI-compatible streaming chat adapter — works with OpenAI, Azure
//! OpenAI-compatible gateways, Ollama, vLLM, and similar endpoints that
//! follow the chat-completions wire format (spec §4.4, §6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rc_domain::config::LlmConfig;
use rc_domain::{ContentPart, Error, Message, MessageContent, Result, Role, StreamEvent, ToolCall, ToolDefinition};
use serde_json::Value;

use crate::sse::sse_response_stream;
use crate::traits::{ChatRequest, LlmProvider};
use crate::util::from_reqwest;

pub struct ChatProvider {
    id: String,
    base_url: String,
    api_key: Arc<str>,
    default_model: String,
    client: reqwest::Client,
}

impl ChatProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: "llm".into(),
            base_url: config.endpoint.clone(),
            api_key: api_key.into(),
            default_model: config.model.clone(),
            client,
        })
    }

    fn effective_model(&self, req: &ChatRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.default_model.clone())
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();

        let mut body = serde_json::json!({
            "model": self.effective_model(req),
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
        });

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(tools);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmProvider for ChatProvider {
    async fn chat_stream(
        &self,
        req: ChatRequest,
    ) -> Result<rc_domain::BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "llm stream request");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        // Tracks index -> provider tool-call id across chunks: most
        // OpenAI-compatible streams carry `id` only on the chunk that opens
        // a tool call (keyed by `index`), and every later argument-delta
        // chunk for that same call carries `index` alone. Resolving deltas
        // back to the id here lets `rc-engine` correlate
        // `ToolCallStarted`/`ToolCallDelta` by the same `call_id`.
        let mut tool_idx_to_id: HashMap<u64, String> = HashMap::new();
        Ok(sse_response_stream(resp, move |data: &str| {
            parse_sse_data_vec(data, &mut tool_idx_to_id)
        }))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => tool_result_to_openai(msg),
        Role::Assistant => assistant_to_openai(msg),
        _ => {
            let text = msg.content.extract_all_text();
            serde_json::json!({
                "role": role_to_str(msg.role),
                "content": text,
            })
        }
    }
}

fn assistant_to_openai(msg: &Message) -> Value {
    let mut obj = serde_json::json!({"role": "assistant"});
    let mut text_parts: Vec<String> = Vec::new();
    let mut tool_calls: Vec<Value> = Vec::new();

    match &msg.content {
        MessageContent::Text(t) => text_parts.push(t.clone()),
        MessageContent::Parts(parts) => {
            for part in parts {
                match part {
                    ContentPart::Text { text } => text_parts.push(text.clone()),
                    ContentPart::ToolUse { id, name, input } => {
                        tool_calls.push(serde_json::json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string(),
                            }
                        }));
                    }
                    _ => {}
                }
            }
        }
    }

    obj["content"] = if text_parts.is_empty() {
        Value::Null
    } else {
        Value::String(text_parts.join("\n"))
    };
    if !tool_calls.is_empty() {
        obj["tool_calls"] = Value::Array(tool_calls);
    }
    obj
}

fn tool_result_to_openai(msg: &Message) -> Value {
    match &msg.content {
        MessageContent::Parts(parts) => {
            for part in parts {
                if let ContentPart::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } = part
                {
                    return serde_json::json!({
                        "role": "tool",
                        "tool_call_id": tool_use_id,
                        "content": content,
                    });
                }
            }
            serde_json::json!({"role": "tool", "tool_call_id": "", "content": ""})
        }
        MessageContent::Text(t) => serde_json::json!({
            "role": "tool",
            "tool_call_id": "",
            "content": t,
        }),
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn parse_openai_usage(v: &Value) -> Option<rc_domain::Usage> {
    Some(rc_domain::Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

fn parse_sse_data(data: &str, tool_idx_to_id: &mut HashMap<u64, String>) -> Option<Result<StreamEvent>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(Error::Json(e))),
    };

    let choice = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first());

    if choice.is_none() {
        if let Some(usage) = v.get("usage").and_then(parse_openai_usage) {
            return Some(Ok(StreamEvent::Done {
                usage: Some(usage),
                finish_reason: None,
            }));
        }
        return None;
    }
    let choice = choice?;
    let delta = choice.get("delta").unwrap_or(&Value::Null);

    if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        let usage = v.get("usage").and_then(parse_openai_usage);
        return Some(Ok(StreamEvent::Done {
            usage,
            finish_reason: Some(fr.to_string()),
        }));
    }

    if let Some(tc_arr) = delta.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_arr {
            let idx = tc.get("index").and_then(|v| v.as_u64()).unwrap_or(0);

            if let Some(id) = tc.get("id").and_then(|v| v.as_str()) {
                tool_idx_to_id.insert(idx, id.to_string());
                let name = tc
                    .get("function")
                    .and_then(|f| f.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                return Some(Ok(StreamEvent::ToolCallStarted {
                    call_id: id.to_string(),
                    tool_name: name.to_string(),
                }));
            }

            if let Some(args) = tc
                .get("function")
                .and_then(|f| f.get("arguments"))
                .and_then(|v| v.as_str())
            {
                // Fall back to the bare index if an id hasn't been seen yet
                // for this index — shouldn't happen with a well-formed
                // stream (the opening chunk always carries `id`), but keeps
                // this resolution total rather than panicking on it.
                let call_id = tool_idx_to_id
                    .get(&idx)
                    .cloned()
                    .unwrap_or_else(|| idx.to_string());
                return Some(Ok(StreamEvent::ToolCallDelta {
                    call_id,
                    delta: args.to_string(),
                }));
            }
        }
    }

    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            return Some(Ok(StreamEvent::Token {
                text: text.to_string(),
            }));
        }
    }

    None
}

fn parse_sse_data_vec(
    data: &str,
    tool_idx_to_id: &mut HashMap<u64, String>,
) -> Vec<Result<StreamEvent>> {
    if data.trim() == "[DONE]" {
        return vec![Ok(StreamEvent::Done {
            usage: None,
            finish_reason: Some("stop".into()),
        })];
    }
    match parse_sse_data(data, tool_idx_to_id) {
        Some(event) => vec![event],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_delta() {
        let raw = r#"{"choices":[{"index":0,"delta":{"content":"Hi"}}]}"#;
        let mut idx_map = HashMap::new();
        match parse_sse_data(raw, &mut idx_map) {
            Some(Ok(StreamEvent::Token { text })) => assert_eq!(text, "Hi"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_tool_call_started_then_delta_share_the_same_call_id() {
        let mut idx_map = HashMap::new();

        let started = r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_faqs"}}]}}]}"#;
        let started_id = match parse_sse_data(started, &mut idx_map) {
            Some(Ok(StreamEvent::ToolCallStarted { call_id, tool_name })) => {
                assert_eq!(call_id, "call_1");
                assert_eq!(tool_name, "get_faqs");
                call_id
            }
            other => panic!("unexpected {other:?}"),
        };

        // The delta chunk carries only `index`, never `id` — the provider
        // convention this whole fix exists to handle.
        let delta = r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"a\":1}"}}]}}]}"#;
        match parse_sse_data(delta, &mut idx_map) {
            Some(Ok(StreamEvent::ToolCallDelta { call_id, delta })) => {
                assert_eq!(delta, "{\"a\":1}");
                assert_eq!(call_id, started_id, "delta must resolve to the id the Started event carried");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_tool_call_delta_before_any_started_falls_back_to_index() {
        let mut idx_map = HashMap::new();
        let delta = r#"{"choices":[{"index":2,"delta":{"tool_calls":[{"index":2,"function":{"arguments":"{}"}}]}}]}"#;
        match parse_sse_data(delta, &mut idx_map) {
            Some(Ok(StreamEvent::ToolCallDelta { call_id, .. })) => assert_eq!(call_id, "2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_done_sentinel() {
        let mut idx_map = HashMap::new();
        let events = parse_sse_data_vec("[DONE]", &mut idx_map);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Done { .. })));
    }

    #[test]
    fn parse_finish_reason_emits_done() {
        let raw = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        let mut idx_map = HashMap::new();
        match parse_sse_data(raw, &mut idx_map) {
            Some(Ok(StreamEvent::Done { finish_reason, .. })) => {
                assert_eq!(finish_reason.as_deref(), Some("stop"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assistant_message_with_tool_calls_serializes() {
        let calls = vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "get_faqs".into(),
            arguments: serde_json::json!({}),
        }];
        let msg = Message::assistant_tool_request("One sec.", &calls);
        let json = assistant_to_openai(&msg);
        assert_eq!(json["content"], "One sec.");
        assert_eq!(json["tool_calls"][0]["function"]["name"], "get_faqs");
    }
}
