//! Streaming text-to-speech client (spec §4.3, §6).
//!
//! Opens one connection per call session. Text fragments go out as
//! `Speak`/`Flush` frames; audio frames and the `Flushed` confirmation
//! come back and are forwarded directly to C1.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rc_domain::config::TtsConfig;
use rc_domain::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Commands the engine sends to the TTS client (spec §4.3).
#[derive(Debug, Clone)]
pub enum TtsCommand {
    SpeakFragment(String),
    Flush,
}

/// Events surfaced back to the session.
#[derive(Debug, Clone)]
pub enum TtsEvent {
    Audio(Vec<u8>),
    Flushed,
}

#[derive(Debug, Default)]
pub struct TtsMetrics {
    pub reconnects: AtomicU64,
}

pub struct TtsClient {
    config: TtsConfig,
    api_key: String,
    voice_id: String,
    metrics: Arc<TtsMetrics>,
}

impl TtsClient {
    pub fn new(config: TtsConfig, api_key: String, voice_id: String) -> Self {
        Self {
            config,
            api_key,
            voice_id,
            metrics: Arc::new(TtsMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<TtsMetrics> {
        self.metrics.clone()
    }

    pub async fn run(
        self,
        mut commands_rx: mpsc::Receiver<TtsCommand>,
        events_tx: mpsc::Sender<TtsEvent>,
        shutdown: CancellationToken,
    ) {
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let result = tokio::select! {
                r = self.connect_and_run(&mut commands_rx, &events_tx) => r,
                _ = shutdown.cancelled() => return,
            };

            if let Err(e) = result {
                tracing::warn!(attempt, error = %e, "tts connection lost");
                self.metrics.reconnects.fetch_add(1, Ordering::Relaxed);
            } else {
                return;
            }

            let delay = std::time::Duration::from_millis(500 * (attempt as u64 + 1).min(20));
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => return,
            }
            attempt += 1;
        }
    }

    async fn connect_and_run(
        &self,
        commands_rx: &mut mpsc::Receiver<TtsCommand>,
        events_tx: &mpsc::Sender<TtsEvent>,
    ) -> Result<()> {
        let url = self.build_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Provider {
                provider: "tts".into(),
                message: e.to_string(),
            })?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
                Error::Provider {
                    provider: "tts".into(),
                    message: e.to_string(),
                }
            })?,
        );

        let (ws, _resp) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::Provider {
                provider: "tts".into(),
                message: e.to_string(),
            })?;
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                cmd = commands_rx.recv() => {
                    match cmd {
                        Some(TtsCommand::SpeakFragment(text)) => {
                            let frame = ProviderFrame::Speak { text };
                            let json = serde_json::to_string(&frame)?;
                            if sink.send(Message::Text(json)).await.is_err() {
                                return Err(Error::ConnectionLost("tts write failed".into()));
                            }
                        }
                        Some(TtsCommand::Flush) => {
                            let json = serde_json::to_string(&ProviderFrame::Flush)?;
                            if sink.send(Message::Text(json)).await.is_err() {
                                return Err(Error::ConnectionLost("tts write failed".into()));
                            }
                        }
                        None => return Ok(()),
                    }
                }
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Binary(bytes))) => {
                            if events_tx.send(TtsEvent::Audio(bytes)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Text(text))) => {
                            if is_flushed(&text) && events_tx.send(TtsEvent::Flushed).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(Error::ConnectionLost("tts closed".into()));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(Error::ConnectionLost(e.to_string())),
                    }
                }
            }
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}?model={}&encoding=mulaw&sample_rate={}&container=none",
            self.config.endpoint, self.voice_id, self.config.sample_rate
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ProviderFrame {
    #[serde(rename = "Speak")]
    Speak { text: String },
    #[serde(rename = "Flush")]
    Flush,
}

#[derive(Debug, Deserialize)]
struct ProviderEvent {
    #[serde(rename = "type")]
    kind: String,
}

fn is_flushed(text: &str) -> bool {
    serde_json::from_str::<ProviderEvent>(text)
        .map(|e| e.kind == "Flushed")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TtsClient {
        TtsClient::new(TtsConfig::default(), "key".into(), "voice-1".into())
    }

    #[test]
    fn build_url_includes_voice_and_encoding() {
        let url = client().build_url();
        assert!(url.contains("model=voice-1"));
        assert!(url.contains("encoding=mulaw"));
        assert!(url.contains("container=none"));
    }

    #[test]
    fn speak_frame_serializes_with_type_tag() {
        let frame = ProviderFrame::Speak {
            text: "hi".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "Speak");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn is_flushed_recognizes_flushed_event() {
        assert!(is_flushed(r#"{"type":"Flushed"}"#));
        assert!(!is_flushed(r#"{"type":"Other"}"#));
        assert!(!is_flushed("not json"));
    }
}
