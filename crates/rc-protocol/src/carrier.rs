//! Wire format for the telephony carrier's per-call WebSocket (spec §4.1,
//! §6). The carrier frames JSON events over text frames; audio is
//! base64-encoded mu-law carried inside `media` events, never raw binary
//! frames — this mirrors how real carrier integrations (Twilio Media
//! Streams and similar) shape the wire.

use serde::{Deserialize, Serialize};

/// Carrier → gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CarrierInbound {
    Connected {
        protocol: String,
        version: String,
    },
    Start {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        #[serde(rename = "callSid")]
        call_sid: String,
        #[serde(default)]
        caller: Option<String>,
    },
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
    Stop {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Gateway → carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CarrierOutbound {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
    /// Instructs the carrier to drop any queued outbound audio — the
    /// barge-in signal (spec §4.1, §4.7).
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded mu-law, 8kHz, 20ms frame.
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

impl CarrierOutbound {
    /// Build a `media` event from raw mu-law audio bytes.
    pub fn media(stream_sid: impl Into<String>, audio: &[u8]) -> Self {
        use base64::Engine;
        CarrierOutbound::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: base64::engine::general_purpose::STANDARD.encode(audio),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        CarrierOutbound::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkPayload { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        CarrierOutbound::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

impl CarrierInbound {
    /// Decode the base64 mu-law payload of a `media` event, if this is one.
    pub fn decode_audio(&self) -> Option<Vec<u8>> {
        use base64::Engine;
        match self {
            CarrierInbound::Media { media, .. } => {
                base64::engine::general_purpose::STANDARD.decode(&media.payload).ok()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_round_trips_through_base64() {
        let audio = vec![0u8, 1, 2, 3, 255];
        let outbound = CarrierOutbound::media("stream-1", &audio);
        let encoded = serde_json::to_string(&outbound).unwrap();
        let decoded: CarrierOutbound = serde_json::from_str(&encoded).unwrap();
        match decoded {
            CarrierOutbound::Media { media, .. } => {
                use base64::Engine;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&media.payload)
                    .unwrap();
                assert_eq!(bytes, audio);
            }
            _ => panic!("expected media event"),
        }
    }

    #[test]
    fn start_event_parses_carrier_shape() {
        let raw = r#"{"event":"start","streamSid":"MZ1","callSid":"CA1","caller":"+15551234567"}"#;
        let parsed: CarrierInbound = serde_json::from_str(raw).unwrap();
        match parsed {
            CarrierInbound::Start { stream_sid, call_sid, caller } => {
                assert_eq!(stream_sid, "MZ1");
                assert_eq!(call_sid, "CA1");
                assert_eq!(caller.as_deref(), Some("+15551234567"));
            }
            _ => panic!("expected start event"),
        }
    }

    #[test]
    fn clear_event_serializes_with_stream_sid() {
        let clear = CarrierOutbound::clear("MZ1");
        let json = serde_json::to_value(&clear).unwrap();
        assert_eq!(json["event"], "clear");
        assert_eq!(json["streamSid"], "MZ1");
    }

    #[test]
    fn decode_audio_returns_none_for_non_media_events() {
        let stop = CarrierInbound::Stop {
            stream_sid: "MZ1".into(),
        };
        assert!(stop.decode_audio().is_none());
    }
}
