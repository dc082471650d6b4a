//! Carrier WebSocket endpoint (spec §4.1, C1).
//!
//! Grounded on the teacher's `nodes/ws.rs::node_ws`/`handle_socket` pair:
//! upgrade, wait for the handshake frame, split the socket into a writer
//! task fed by a channel and a reader loop that parses inbound frames and
//! forwards them into the call session.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rc_domain::config::{SttConfig, TtsConfig};
use rc_protocol::carrier::{CarrierInbound, CarrierOutbound};
use rc_session::{CallSession, SessionIo};
use rc_stt::SttClient;
use rc_tts::TtsClient;

use crate::registry::ActiveCall;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Tenant key, preferred source for tenant resolution (spec §4.9).
    pub tenant: Option<String>,
    /// Dialed number, fallback tenant-resolution key.
    pub to: Option<String>,
}

/// GET /v1/carrier/ws — upgrade to a per-call carrier WebSocket.
pub async fn carrier_ws(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

async fn handle_socket(socket: WebSocket, state: GatewayState, query: WsQuery) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let start = match wait_for_start(&mut ws_stream).await {
        Some(s) => s,
        None => {
            tracing::warn!("carrier disconnected before sending a start frame");
            return;
        }
    };
    let (call_id, stream_sid, caller_phone) = match start {
        CarrierInbound::Start {
            stream_sid,
            call_sid,
            caller,
            ..
        } => (call_sid, stream_sid, caller.unwrap_or_default()),
        _ => unreachable!("wait_for_start only returns Start frames"),
    };

    let tenant_key = query.tenant.unwrap_or_default();
    let dialed_number = query.to.unwrap_or_default();
    let tenant = state.tenants.resolve(&tenant_key, &dialed_number);
    let tenant_id = tenant.tenant_id.clone();

    tracing::info!(call_id = %call_id, tenant_id = %tenant_id, "call started");

    let shutdown = CancellationToken::new();
    state.registry.register(ActiveCall {
        call_id: call_id.clone(),
        tenant_id: tenant_id.clone(),
        started_at: Utc::now(),
        shutdown: shutdown.clone(),
    });

    let (carrier_in_tx, carrier_in_rx) = mpsc::channel::<CarrierInbound>(64);
    let (carrier_out_tx, mut carrier_out_rx) = mpsc::channel::<CarrierOutbound>(64);
    let (stt_audio_tx, stt_audio_rx) = mpsc::channel::<Vec<u8>>(64);
    let (stt_events_tx, stt_events_rx) = mpsc::channel(64);
    let (tts_cmd_tx, tts_cmd_rx) = mpsc::channel(64);
    let (tts_events_tx, tts_events_rx) = mpsc::channel(64);

    let stt = SttClient::new(
        stt_config_for(&state),
        state.stt_api_key.to_string(),
    );
    let tts = TtsClient::new(
        tts_config_for(&state),
        state.tts_api_key.to_string(),
        tenant.voice.voice_id.clone(),
    );

    let stt_metrics = stt.metrics();
    let tts_metrics = tts.metrics();

    let stt_shutdown = shutdown.clone();
    let stt_task = tokio::spawn(async move { stt.run(stt_audio_rx, stt_events_tx, stt_shutdown).await });
    let tts_shutdown = shutdown.clone();
    let tts_task = tokio::spawn(async move { tts.run(tts_cmd_rx, tts_events_tx, tts_shutdown).await });

    let session = CallSession::new(
        call_id.clone(),
        stream_sid,
        caller_phone,
        tenant,
        state.config.session.clone(),
        state.session_deps.clone(),
    )
    .with_provider_metrics(stt_metrics, tts_metrics);
    let io = SessionIo {
        carrier_in: carrier_in_rx,
        carrier_out: carrier_out_tx,
        stt_audio_tx,
        stt_events: stt_events_rx,
        tts_cmd_tx,
        tts_events: tts_events_rx,
    };
    let session_task = tokio::spawn(session.run(io));

    // Writer task: forward outbound carrier frames to the WS sink.
    let writer = tokio::spawn(async move {
        while let Some(frame) = carrier_out_rx.recv().await {
            if send_ws_message(&mut ws_sink, &frame).await.is_err() {
                break;
            }
        }
    });

    // Reader loop: parse inbound carrier frames and forward them to the
    // session, until the carrier hangs up or the call ends.
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<CarrierInbound>(&text) {
                            Ok(frame) => {
                                if carrier_in_tx.send(frame).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::debug!(call_id = %call_id, error = %e, "ignoring unparseable carrier frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(call_id = %call_id, error = %e, "carrier socket error");
                        break;
                    }
                }
            }
        }
    }

    drop(carrier_in_tx);
    shutdown.cancel();

    let metrics = session_task.await.unwrap_or_default();
    writer.abort();
    stt_task.abort();
    tts_task.abort();
    state.registry.remove(&call_id);

    tracing::info!(
        call_id = %call_id,
        tenant_id = %tenant_id,
        audio_bytes_in = metrics.audio_bytes_in,
        audio_bytes_out = metrics.audio_bytes_out,
        barge_ins = metrics.barge_in_count,
        tool_calls = metrics.tool_call_count,
        "call ended"
    );
}

fn stt_config_for(state: &GatewayState) -> SttConfig {
    state.config.stt.clone()
}

fn tts_config_for(state: &GatewayState) -> TtsConfig {
    state.config.tts.clone()
}

async fn wait_for_start(
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<CarrierInbound> {
    let result = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = stream.next().await {
            if let Message::Text(text) = msg {
                match serde_json::from_str::<CarrierInbound>(&text) {
                    Ok(frame @ CarrierInbound::Start { .. }) => return Some(frame),
                    Ok(_) => continue, // e.g. a leading `connected` frame
                    Err(_) => continue,
                }
            }
        }
        None
    })
    .await;

    result.unwrap_or(None)
}

async fn send_ws_message(
    sink: &mut (impl SinkExt<Message> + Unpin),
    frame: &CarrierOutbound,
) -> Result<(), ()> {
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}

