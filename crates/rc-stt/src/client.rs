//! Streaming speech-to-text client (spec §4.2, §6).
//!
//! Connects once per call session, forwards inbound audio frames, and
//! surfaces `Transcript`/`UtteranceEnd` events. Reconnects with backoff on
//! provider-side close; while disconnected, inbound audio is buffered up
//! to a bounded limit and dropped beyond it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rc_domain::config::SttConfig;
use rc_domain::{Error, Result};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::reconnect::Backoff;

/// Events surfaced to the call session (spec §4.2).
#[derive(Debug, Clone)]
pub enum SttEvent {
    /// A transcript fragment. `is_final` partials only update diagnostics;
    /// finals are appended to the session's transcript buffer.
    Transcript { text: String, is_final: bool },
    /// Trailing-silence signal — closes the current user turn.
    UtteranceEnd,
}

/// Counters exposed for the call's metrics record (spec §3).
#[derive(Debug, Default)]
pub struct SttMetrics {
    pub reconnects: AtomicU64,
    pub frames_dropped: AtomicU64,
}

pub struct SttClient {
    config: SttConfig,
    api_key: String,
    metrics: Arc<SttMetrics>,
}

impl SttClient {
    pub fn new(config: SttConfig, api_key: String) -> Self {
        Self {
            config,
            api_key,
            metrics: Arc::new(SttMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<SttMetrics> {
        self.metrics.clone()
    }

    /// Run the client until `shutdown` is cancelled. `audio_rx` carries raw
    /// mu-law frames from C1; `events_tx` carries decoded STT events to C7.
    pub async fn run(
        self,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
        events_tx: mpsc::Sender<SttEvent>,
        shutdown: CancellationToken,
    ) {
        let backoff: Backoff = self.config.reconnect.into();
        let mut attempt: u32 = 0;
        let mut pending: Vec<Vec<u8>> = Vec::new();

        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let result = tokio::select! {
                r = self.connect_and_run(&mut audio_rx, &events_tx, &mut pending) => r,
                _ = shutdown.cancelled() => return,
            };

            if let Err(e) = result {
                tracing::warn!(attempt, error = %e, "stt connection lost");
                self.metrics.reconnects.fetch_add(1, Ordering::Relaxed);
            } else {
                return;
            }

            if backoff.should_give_up(attempt) {
                tracing::error!(attempt, "stt reconnect attempts exhausted");
                return;
            }

            let delay = backoff.delay_for_attempt(attempt);
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    _ = shutdown.cancelled() => return,
                    frame = audio_rx.recv() => {
                        match frame {
                            Some(bytes) => self.buffer_while_disconnected(&mut pending, bytes),
                            None => return, // session closed the audio source
                        }
                    }
                }
            }
            attempt += 1;
        }
    }

    async fn connect_and_run(
        &self,
        audio_rx: &mut mpsc::Receiver<Vec<u8>>,
        events_tx: &mpsc::Sender<SttEvent>,
        pending: &mut Vec<Vec<u8>>,
    ) -> Result<()> {
        let url = self.build_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Provider {
                provider: "stt".into(),
                message: e.to_string(),
            })?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Token {}", self.api_key)).map_err(|e| {
                Error::Provider {
                    provider: "stt".into(),
                    message: e.to_string(),
                }
            })?,
        );

        let (ws, _resp) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::Provider {
                provider: "stt".into(),
                message: e.to_string(),
            })?;
        let (mut sink, mut stream) = ws.split();

        // Drain anything buffered while disconnected before live frames.
        for frame in pending.drain(..) {
            sink.send(Message::Binary(frame))
                .await
                .map_err(|e| Error::ConnectionLost(e.to_string()))?;
        }

        loop {
            tokio::select! {
                frame = audio_rx.recv() => {
                    match frame {
                        Some(bytes) => {
                            if sink.send(Message::Binary(bytes)).await.is_err() {
                                return Err(Error::ConnectionLost("stt write failed".into()));
                            }
                        }
                        None => return Ok(()), // session closed the audio source
                    }
                }
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_event(&text) {
                                if events_tx.send(event).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(Error::ConnectionLost("stt closed".into()));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(Error::ConnectionLost(e.to_string())),
                    }
                }
            }
        }
    }

    /// Buffer a frame while disconnected, dropping the oldest once the
    /// configured limit is exceeded (spec §4.2).
    pub fn buffer_while_disconnected(&self, pending: &mut Vec<Vec<u8>>, frame: Vec<u8>) {
        if pending.len() >= self.config.buffered_frame_limit {
            pending.remove(0);
            self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
        pending.push(frame);
    }

    fn build_url(&self) -> String {
        format!(
            "{}?model={}&language={}&encoding=mulaw&sample_rate={}&channels=1&punctuate=true&interim_results=true&utterance_end_ms={}&vad_events=true&endpointing={}",
            self.config.endpoint,
            self.config.model,
            self.config.language,
            self.config.sample_rate,
            self.config.utterance_end_ms,
            self.config.endpointing_ms,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ProviderEvent {
    #[serde(rename = "Results")]
    Results { channel: ResultsChannel },
    #[serde(rename = "UtteranceEnd")]
    UtteranceEnd,
}

#[derive(Debug, Deserialize)]
struct ResultsChannel {
    alternatives: Vec<ResultAlternative>,
    #[serde(default)]
    is_final: bool,
}

#[derive(Debug, Deserialize)]
struct ResultAlternative {
    transcript: String,
}

fn parse_event(text: &str) -> Option<SttEvent> {
    let parsed: ProviderEvent = serde_json::from_str(text).ok()?;
    match parsed {
        ProviderEvent::Results { channel } => {
            let transcript = channel.alternatives.into_iter().next()?.transcript;
            if transcript.is_empty() {
                return None;
            }
            Some(SttEvent::Transcript {
                text: transcript,
                is_final: channel.is_final,
            })
        }
        ProviderEvent::UtteranceEnd => Some(SttEvent::UtteranceEnd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SttClient {
        SttClient::new(SttConfig::default(), "test-key".into())
    }

    #[test]
    fn build_url_includes_required_params() {
        let url = client().build_url();
        assert!(url.contains("encoding=mulaw"));
        assert!(url.contains("utterance_end_ms=2000"));
        assert!(url.contains("endpointing=2500"));
        assert!(url.contains("channels=1"));
    }

    #[test]
    fn parse_event_extracts_final_transcript() {
        let raw = r#"{"type":"Results","channel":{"alternatives":[{"transcript":"hello"}],"is_final":true}}"#;
        match parse_event(raw) {
            Some(SttEvent::Transcript { text, is_final }) => {
                assert_eq!(text, "hello");
                assert!(is_final);
            }
            _ => panic!("expected transcript event"),
        }
    }

    #[test]
    fn parse_event_empty_transcript_is_skipped() {
        let raw = r#"{"type":"Results","channel":{"alternatives":[{"transcript":""}],"is_final":false}}"#;
        assert!(parse_event(raw).is_none());
    }

    #[test]
    fn parse_event_recognizes_utterance_end() {
        let raw = r#"{"type":"UtteranceEnd"}"#;
        assert!(matches!(parse_event(raw), Some(SttEvent::UtteranceEnd)));
    }

    #[test]
    fn buffer_drops_oldest_beyond_limit() {
        let c = SttClient::new(
            SttConfig {
                buffered_frame_limit: 2,
                ..SttConfig::default()
            },
            "k".into(),
        );
        let mut pending = Vec::new();
        c.buffer_while_disconnected(&mut pending, vec![1]);
        c.buffer_while_disconnected(&mut pending, vec![2]);
        c.buffer_while_disconnected(&mut pending, vec![3]);
        assert_eq!(pending, vec![vec![2], vec![3]]);
        assert_eq!(c.metrics.frames_dropped.load(Ordering::Relaxed), 1);
    }
}
