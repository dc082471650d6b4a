use rc_domain::{BoxStream, Message, Result, StreamEvent, ToolDefinition};

/// A provider-agnostic chat completion request (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

/// Trait every LLM adapter implements. The engine only ever streams — a
/// full non-streaming `chat` isn't part of the hot path this core serves.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat_stream(&self, req: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    fn provider_id(&self) -> &str;
}
