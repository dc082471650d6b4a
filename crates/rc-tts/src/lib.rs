pub mod client;
pub mod sentence;

pub use client::{TtsClient, TtsCommand, TtsEvent, TtsMetrics};
pub use sentence::SentenceBuffer;
