//! Call session state machine (spec §4.7, C7) — "the heart": wires the
//! carrier transport (C1), STT (C2), the conversation engine (C6), and TTS
//! (C3) around one call's `TurnState`.
//!
//! Grounded on the teacher's `runtime/turn.rs` (spawn one run per trigger,
//! clean up its cancel token on completion) and `sessions/src/lifecycle.rs`
//! (evaluate a timeout condition against wall-clock state on every event,
//! rather than a separate timer task per rule) plus the turn-state enum
//! precedent from an `other_examples` voice-session file
//! (Idle/Listening/Processing/Speaking, generalized here to this spec's
//! five-state machine in `rc_domain::model::TurnState`).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use tokio_util::sync::CancellationToken;

use rc_domain::config::SessionConfig;
use rc_domain::{CallMetrics, ConversationTurn, Result, TenantSnapshot, TurnRole, TurnState};
use rc_engine::{build_system_prompt, run_engine, EngineInput};
use rc_llm::LlmProvider;
use rc_protocol::carrier::{CarrierInbound, CarrierOutbound};
use rc_stt::{SttEvent, SttMetrics};
use rc_tools::ToolRouter;
use rc_tts::{TtsCommand, TtsEvent, TtsMetrics};

use crate::cancel::CancelMap;
use crate::debounce::Debouncer;
use crate::lock::SessionLockMap;
use crate::sinks::{BookingRequest, BookingSink, SmsSink};

/// The channels one running call session is wired to. Owned by
/// `rc-gateway`, which spawns the carrier WS reader/writer and the STT/TTS
/// clients around the same channel endpoints.
pub struct SessionIo {
    pub carrier_in: mpsc::Receiver<CarrierInbound>,
    pub carrier_out: mpsc::Sender<CarrierOutbound>,
    pub stt_audio_tx: mpsc::Sender<Vec<u8>>,
    pub stt_events: mpsc::Receiver<SttEvent>,
    pub tts_cmd_tx: mpsc::Sender<TtsCommand>,
    pub tts_events: mpsc::Receiver<TtsEvent>,
}

/// Shared across every call on this gateway instance.
pub struct SessionDeps {
    pub provider: Arc<dyn LlmProvider>,
    pub tools: Arc<ToolRouter>,
    pub locks: Arc<SessionLockMap>,
    pub cancels: Arc<CancelMap>,
    pub booking_sink: Arc<dyn BookingSink>,
    pub sms_sink: Arc<dyn SmsSink>,
}

/// A turn whose trigger arrived while the previous one was still in
/// flight, now holding the run lock and ready to start (spec §4.7: the
/// trigger waits, it is not dropped).
struct QueuedTurn {
    text: String,
    permit: OwnedSemaphorePermit,
}

/// Outcome of a detached booking/SMS sink invocation, folded back into
/// the session's metrics by the main loop (the spawn that runs the sinks
/// cannot touch `self` directly).
struct SinkOutcome {
    booking_ok: bool,
    sms_ok: bool,
}

pub struct CallSession {
    call_id: String,
    stream_sid: String,
    caller_phone: String,
    tenant: TenantSnapshot,
    config: SessionConfig,
    deps: Arc<SessionDeps>,

    state: TurnState,
    history: Vec<ConversationTurn>,
    next_seq: u64,
    metrics: CallMetrics,
    call_start: Instant,

    transcript_acc: String,
    debouncer: Debouncer,
    farewell_timer: Debouncer,
    farewell_pending: bool,
    booking_sent: bool,
    last_activity: Instant,
    tts_tx: Option<mpsc::Sender<TtsCommand>>,

    pending_waiter: Option<CancellationToken>,
    requeue_tx: mpsc::Sender<QueuedTurn>,
    requeue_rx: Option<mpsc::Receiver<QueuedTurn>>,

    stt_metrics: Option<Arc<SttMetrics>>,
    tts_metrics: Option<Arc<TtsMetrics>>,
}

impl CallSession {
    pub fn new(
        call_id: String,
        stream_sid: String,
        caller_phone: String,
        tenant: TenantSnapshot,
        config: SessionConfig,
        deps: Arc<SessionDeps>,
    ) -> Self {
        let (requeue_tx, requeue_rx) = mpsc::channel(1);
        Self {
            call_id,
            stream_sid,
            caller_phone,
            tenant,
            config,
            deps,
            state: TurnState::Idle,
            history: Vec::new(),
            next_seq: 1,
            metrics: CallMetrics::default(),
            call_start: Instant::now(),
            transcript_acc: String::new(),
            debouncer: Debouncer::new(),
            farewell_timer: Debouncer::new(),
            farewell_pending: false,
            booking_sent: false,
            last_activity: Instant::now(),
            tts_tx: None,
            pending_waiter: None,
            requeue_tx,
            requeue_rx: Some(requeue_rx),
            stt_metrics: None,
            tts_metrics: None,
        }
    }

    /// Attach the STT/TTS client metrics handles so their reconnect
    /// counters land in the call's final `CallMetrics` (spec §3). Called
    /// by `rc-gateway` before `run`, once the clients have been
    /// constructed.
    pub fn with_provider_metrics(
        mut self,
        stt_metrics: Arc<SttMetrics>,
        tts_metrics: Arc<TtsMetrics>,
    ) -> Self {
        self.stt_metrics = Some(stt_metrics);
        self.tts_metrics = Some(tts_metrics);
        self
    }

    // ── pure decision helpers (unit tested directly) ──────────────────

    /// A partial transcript during `AiSpeaking` counts as barge-in once it
    /// clears the configured character floor (spec §4.7: 6 triggers, 5
    /// does not, with the default floor at 5).
    fn is_barge_in(&self, partial_text: &str) -> bool {
        self.state == TurnState::AiSpeaking
            && partial_text.trim().chars().count() > self.config.barge_in_min_chars
    }

    /// Explicit farewell phrases, not mere politeness tokens (spec §4.7).
    fn is_farewell(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.config
            .farewell_phrases
            .iter()
            .any(|phrase| lower.contains(&phrase.to_lowercase()))
    }

    fn is_idle_timed_out(&self, now: Instant) -> bool {
        now.duration_since(self.last_activity) >= Duration::from_secs(self.config.idle_guard_secs)
    }

    /// Attempt a transition, logging and refusing an illegal one instead
    /// of panicking (spec §4.7's machine is advisory at the edges — a
    /// provider hiccup that requests an impossible move should not crash
    /// the call).
    fn transition(&mut self, next: TurnState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(call_id = %self.call_id, from = ?self.state, to = ?next, "rejected illegal turn-state transition");
            return false;
        }
        self.state = next;
        true
    }

    fn seal_turn(&mut self, role: TurnRole, content: String) {
        self.history.push(ConversationTurn {
            seq: self.next_seq,
            role,
            content,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
            interrupted: false,
        });
        self.next_seq += 1;
    }

    fn mark_elapsed(slot: &mut Option<u64>, call_start: Instant, at: Instant) {
        if slot.is_none() {
            *slot = Some(at.saturating_duration_since(call_start).as_millis() as u64);
        }
    }

    // ── the actor loop ─────────────────────────────────────────────────

    /// Run the session until the call ends (carrier `stop`, farewell
    /// completion, or the idle guard), returning the final metrics.
    pub async fn run(mut self, mut io: SessionIo) -> CallMetrics {
        self.tts_tx = Some(io.tts_cmd_tx.clone());
        self.send_greeting(&io.tts_cmd_tx).await;

        let (debounce_tx, mut debounce_rx) = mpsc::channel(1);
        let (farewell_tx, mut farewell_rx) = mpsc::channel(1);
        let (sink_tx, mut sink_rx) = mpsc::channel(4);
        let mut requeue_rx = self.requeue_rx.take().expect("requeue_rx set at construction");
        let mut engine_task: Option<tokio::task::JoinHandle<Result<rc_engine::EngineOutput>>> =
            None;
        let mut idle_tick = tokio::time::interval(Duration::from_secs(1));

        loop {
            if self.state == TurnState::Ending && engine_task.is_none() {
                break;
            }

            tokio::select! {
                biased;

                inbound = io.carrier_in.recv() => {
                    match inbound {
                        Some(frame @ CarrierInbound::Media { .. }) => {
                            self.last_activity = Instant::now();
                            if let Some(bytes) = frame.decode_audio() {
                                if self.metrics.audio_bytes_in == 0 {
                                    Self::mark_elapsed(&mut self.metrics.first_audio_in_ms, self.call_start, Instant::now());
                                }
                                self.metrics.audio_bytes_in += bytes.len() as u64;
                                let _ = io.stt_audio_tx.send(bytes).await;
                            }
                        }
                        Some(CarrierInbound::Stop { .. }) => {
                            self.transition(TurnState::Ending);
                        }
                        Some(_) => {}
                        None => break, // carrier hung up without a `stop` frame
                    }
                }

                event = io.stt_events.recv() => {
                    match event {
                        Some(SttEvent::Transcript { text, is_final }) => {
                            self.last_activity = Instant::now();
                            Self::mark_elapsed(&mut self.metrics.first_transcript_ms, self.call_start, Instant::now());
                            if is_final {
                                if self.state == TurnState::Idle {
                                    self.transition(TurnState::UserSpeaking);
                                }
                                if !self.transcript_acc.is_empty() {
                                    self.transcript_acc.push(' ');
                                }
                                self.transcript_acc.push_str(&text);
                            } else if self.is_barge_in(&text) {
                                self.handle_barge_in(&mut io).await;
                            }
                        }
                        Some(SttEvent::UtteranceEnd) => {
                            if !self.transcript_acc.trim().is_empty() {
                                self.transition(TurnState::Thinking);
                                self.debouncer.schedule(
                                    Duration::from_millis(self.config.debounce_ms),
                                    debounce_tx.clone(),
                                );
                            }
                        }
                        None => break,
                    }
                }

                Some(()) = debounce_rx.recv() => {
                    if let Some(handle) = self.start_turn(farewell_tx.clone()) {
                        engine_task = Some(handle);
                    }
                }

                Some(queued) = requeue_rx.recv() => {
                    self.pending_waiter = None;
                    if let Some(handle) = self.begin_turn(queued.text, queued.permit, farewell_tx.clone()) {
                        engine_task = Some(handle);
                    }
                }

                tts_event = io.tts_events.recv() => {
                    match tts_event {
                        Some(TtsEvent::Audio(bytes)) => {
                            self.last_activity = Instant::now();
                            Self::mark_elapsed(&mut self.metrics.first_tts_audio_ms, self.call_start, Instant::now());
                            self.metrics.audio_bytes_out += bytes.len() as u64;
                            let frame = CarrierOutbound::media(self.stream_sid.clone(), &bytes);
                            let _ = io.carrier_out.send(frame).await;
                        }
                        Some(TtsEvent::Flushed) => {
                            if self.farewell_pending && self.state != TurnState::AiSpeaking {
                                self.transition(TurnState::Ending);
                            }
                        }
                        None => {}
                    }
                }

                result = async {
                    match &mut engine_task {
                        Some(handle) => handle.await,
                        None => std::future::pending().await,
                    }
                }, if engine_task.is_some() => {
                    engine_task = None;
                    self.deps.cancels.remove(&self.call_id);
                    self.finish_turn(result, sink_tx.clone());
                }

                Some(outcome) = sink_rx.recv() => {
                    if outcome.booking_ok {
                        self.metrics.booking_writes += 1;
                    }
                    if outcome.sms_ok {
                        self.metrics.sms_sends += 1;
                    }
                }

                Some(()) = farewell_rx.recv() => {
                    if self.farewell_pending {
                        tracing::info!(call_id = %self.call_id, "farewell fail-safe timeout elapsed, ending call");
                        self.transition(TurnState::Ending);
                    }
                }

                _ = idle_tick.tick() => {
                    if self.is_idle_timed_out(Instant::now()) {
                        tracing::info!(call_id = %self.call_id, "idle guard ending call");
                        self.transition(TurnState::Ending);
                    }
                }
            }
        }

        if let Some(token) = self.pending_waiter.take() {
            token.cancel();
        }
        self.debouncer.cancel();
        self.farewell_timer.cancel();
        self.deps.locks.remove(&self.call_id);
        self.deps.cancels.remove(&self.call_id);

        if let Some(stt_metrics) = &self.stt_metrics {
            self.metrics.stt_reconnect_count =
                stt_metrics.reconnects.load(std::sync::atomic::Ordering::Relaxed) as u32;
        }
        if let Some(tts_metrics) = &self.tts_metrics {
            self.metrics.tts_reconnect_count =
                tts_metrics.reconnects.load(std::sync::atomic::Ordering::Relaxed) as u32;
        }

        self.metrics
    }

    async fn send_greeting(&mut self, tts_cmd_tx: &mpsc::Sender<TtsCommand>) {
        match &self.tenant.greeting {
            rc_domain::Greeting::Text(text) => {
                let _ = tts_cmd_tx.send(TtsCommand::SpeakFragment(text.clone())).await;
                let _ = tts_cmd_tx.send(TtsCommand::Flush).await;
                self.seal_turn(TurnRole::Assistant, text.clone());
            }
            rc_domain::Greeting::AudioRef(name) => {
                // Pre-rendered audio is served by C1 directly from the
                // carrier's own media store; C7 only needs to know not to
                // double-speak a text greeting.
                tracing::debug!(call_id = %self.call_id, audio_ref = %name, "greeting served as pre-rendered audio");
            }
        }
        self.transition(TurnState::AiSpeaking);
        self.transition(TurnState::Idle);
    }

    async fn handle_barge_in(&mut self, io: &mut SessionIo) {
        tracing::info!(call_id = %self.call_id, "barge-in detected, clearing carrier playback");
        let _ = io
            .carrier_out
            .send(CarrierOutbound::clear(self.stream_sid.clone()))
            .await;
        self.deps.cancels.cancel(&self.call_id);
        self.metrics.barge_in_count += 1;
        self.transition(TurnState::UserSpeaking);
    }

    /// Seal the accumulated user utterance and spawn the engine run. If a
    /// turn is already in flight, the trigger is queued rather than
    /// dropped (spec §4.7, §9 Open Question 1): it waits on the run lock
    /// in a detached task and rejoins the main loop through `requeue_tx`
    /// once the lock frees up, unless a newer trigger supersedes it
    /// first.
    fn start_turn(
        &mut self,
        farewell_tx: mpsc::Sender<()>,
    ) -> Option<tokio::task::JoinHandle<Result<rc_engine::EngineOutput>>> {
        let text = std::mem::take(&mut self.transcript_acc);
        if text.trim().is_empty() {
            return None;
        }
        match self.deps.locks.try_acquire(&self.call_id) {
            Ok(permit) => self.begin_turn(text, permit, farewell_tx),
            Err(_) => {
                tracing::info!(call_id = %self.call_id, "turn in flight, queuing trigger to wait on the run lock");
                if let Some(old) = self.pending_waiter.take() {
                    old.cancel();
                }
                let token = CancellationToken::new();
                self.pending_waiter = Some(token.clone());
                let locks = self.deps.locks.clone();
                let call_id = self.call_id.clone();
                let requeue_tx = self.requeue_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {}
                        permit = locks.acquire(&call_id) => {
                            if let Ok(permit) = permit {
                                let _ = requeue_tx.send(QueuedTurn { text, permit }).await;
                            }
                        }
                    }
                });
                None
            }
        }
    }

    /// Common path for a turn that has already secured the run-lock
    /// permit, whether that happened immediately (`start_turn`) or after
    /// waiting (`requeue_rx`).
    fn begin_turn(
        &mut self,
        text: String,
        permit: OwnedSemaphorePermit,
        farewell_tx: mpsc::Sender<()>,
    ) -> Option<tokio::task::JoinHandle<Result<rc_engine::EngineOutput>>> {
        self.farewell_pending = self.is_farewell(&text);
        if self.farewell_pending {
            self.farewell_timer.schedule(
                Duration::from_secs(self.config.farewell_timeout_secs),
                farewell_tx,
            );
        }
        self.seal_turn(TurnRole::User, text);
        self.transition(TurnState::AiSpeaking);

        let cancel = self.deps.cancels.register(&self.call_id);
        let input = EngineInput {
            tenant: self.tenant.clone(),
            system_prompt: build_system_prompt(&self.tenant),
            history: self.history.clone(),
            next_seq: self.next_seq,
        };
        let provider = self.deps.provider.clone();
        let tools = self.deps.tools.clone();
        // The TTS command channel is cloned into the spawned task; the
        // session keeps its own clone for the greeting and stays alive
        // independently of any one turn.
        let tts_tx = self.tts_tx_for_turn();

        Some(tokio::spawn(async move {
            let _permit = permit; // held for the lifetime of this turn
            run_engine(provider, tools, tts_tx, input, cancel).await
        }))
    }

    /// Placeholder resolved by `rc-gateway` at construction time; kept as
    /// a method so `start_turn` reads the same way regardless of which
    /// channel clone backs it.
    fn tts_tx_for_turn(&self) -> mpsc::Sender<TtsCommand> {
        self.tts_tx
            .clone()
            .expect("tts_tx set before the first turn can start")
    }

    fn finish_turn(
        &mut self,
        result: std::result::Result<Result<rc_engine::EngineOutput>, tokio::task::JoinError>,
        sink_tx: mpsc::Sender<SinkOutcome>,
    ) {
        match result {
            Ok(Ok(output)) => {
                Self::mark_elapsed_from(
                    &mut self.metrics.first_llm_token_ms,
                    self.call_start,
                    output.first_token_at,
                );
                let mut confirmation: Option<String> = None;
                for turn in output.turns {
                    self.metrics.tool_call_count += turn.tool_calls.len() as u32;
                    if !self.booking_sent
                        && turn.role == TurnRole::Assistant
                        && crate::sinks::looks_like_booking_confirmation(&turn.content)
                    {
                        confirmation = Some(turn.content.clone());
                    }
                    self.next_seq = self.next_seq.max(turn.seq + 1);
                    self.history.push(turn);
                }
                if let Some(summary) = confirmation {
                    self.booking_sent = true;
                    self.spawn_booking_sinks(summary, sink_tx);
                }
                if self.state == TurnState::AiSpeaking {
                    if self.farewell_pending {
                        self.transition(TurnState::Ending);
                    } else {
                        self.transition(TurnState::Idle);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(call_id = %self.call_id, error = %e, "engine run failed");
                if self.state == TurnState::AiSpeaking {
                    self.transition(TurnState::Idle);
                }
            }
            Err(join_err) => {
                tracing::error!(call_id = %self.call_id, error = %join_err, "engine task panicked");
                if self.state == TurnState::AiSpeaking {
                    self.transition(TurnState::Idle);
                }
            }
        }
    }

    fn mark_elapsed_from(slot: &mut Option<u64>, call_start: Instant, at: Option<Instant>) {
        if let Some(at) = at {
            Self::mark_elapsed(slot, call_start, at);
        }
    }

    /// Invoke the booking-write and SMS-confirmation sinks once per call
    /// (spec §4.7, §1): detached so a slow or failing downstream never
    /// stalls the turn loop or fails the call; the result is folded back
    /// into metrics through `sink_tx`.
    fn spawn_booking_sinks(&self, summary: String, sink_tx: mpsc::Sender<SinkOutcome>) {
        let booking_sink = self.deps.booking_sink.clone();
        let sms_sink = self.deps.sms_sink.clone();
        let tenant_id = self.tenant.tenant_id.clone();
        let call_id = self.call_id.clone();
        let caller_phone = self.caller_phone.clone();
        tokio::spawn(async move {
            let booking_ok = booking_sink
                .create_booking(BookingRequest {
                    tenant_id: &tenant_id,
                    call_id: &call_id,
                    caller_phone: &caller_phone,
                    summary: &summary,
                })
                .await
                .map_err(|e| tracing::warn!(call_id = %call_id, error = %e, "booking sink failed"))
                .is_ok();

            let sms_ok = if caller_phone.is_empty() {
                false
            } else {
                sms_sink
                    .send_confirmation(&caller_phone, &summary)
                    .await
                    .map_err(|e| tracing::warn!(call_id = %call_id, error = %e, "sms sink failed"))
                    .is_ok()
            };

            let _ = sink_tx.send(SinkOutcome { booking_ok, sms_ok }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_domain::config::SessionConfig;
    use crate::sinks::{LoggingBookingSink, LoggingSmsSink};

    fn session_in_state(state: TurnState) -> CallSession {
        let deps = Arc::new(SessionDeps {
            provider: unimplemented_provider(),
            tools: unimplemented_tools(),
            locks: Arc::new(SessionLockMap::new()),
            cancels: Arc::new(CancelMap::new()),
            booking_sink: Arc::new(LoggingBookingSink),
            sms_sink: Arc::new(LoggingSmsSink),
        });
        let mut session = CallSession::new(
            "call-1".into(),
            "MZ1".into(),
            "+15551234567".into(),
            TenantSnapshot::generic(),
            SessionConfig::default(),
            deps,
        );
        session.state = state;
        session
    }

    fn unimplemented_provider() -> Arc<dyn LlmProvider> {
        struct Never;
        #[async_trait::async_trait]
        impl LlmProvider for Never {
            async fn chat_stream(
                &self,
                _req: rc_llm::ChatRequest,
            ) -> Result<rc_domain::BoxStream<'static, Result<rc_domain::StreamEvent>>> {
                unreachable!("not exercised by these tests")
            }
            fn provider_id(&self) -> &str {
                "never"
            }
        }
        Arc::new(Never)
    }

    fn unimplemented_tools() -> Arc<ToolRouter> {
        let store = rc_tenant::TenantStore::load(std::path::Path::new("/nonexistent")).unwrap();
        let cache = Arc::new(rc_tenant::TenantCache::new(store, Duration::from_secs(60)));
        Arc::new(ToolRouter::new(cache))
    }

    #[test]
    fn short_partial_during_ai_speaking_is_not_barge_in() {
        let session = session_in_state(TurnState::AiSpeaking);
        assert!(!session.is_barge_in("stop"));
    }

    #[test]
    fn six_chars_during_ai_speaking_is_barge_in() {
        let session = session_in_state(TurnState::AiSpeaking);
        assert!(session.is_barge_in("wait a"));
    }

    #[test]
    fn long_partial_outside_ai_speaking_is_not_barge_in() {
        let session = session_in_state(TurnState::UserSpeaking);
        assert!(!session.is_barge_in("wait just a moment please"));
    }

    #[test]
    fn explicit_farewell_phrase_matches() {
        let session = session_in_state(TurnState::Idle);
        assert!(session.is_farewell("okay, that's all, bye!"));
    }

    #[test]
    fn polite_closing_without_farewell_phrase_does_not_match() {
        let session = session_in_state(TurnState::Idle);
        assert!(!session.is_farewell("thank you so much for your help"));
    }

    #[test]
    fn idle_timeout_respects_configured_window() {
        let mut session = session_in_state(TurnState::Idle);
        session.config.idle_guard_secs = 30;
        session.last_activity = Instant::now() - Duration::from_secs(31);
        assert!(session.is_idle_timed_out(Instant::now()));
    }

    #[test]
    fn recent_activity_is_not_timed_out() {
        let session = session_in_state(TurnState::Idle);
        assert!(!session.is_idle_timed_out(Instant::now()));
    }

    #[test]
    fn illegal_transition_is_rejected_and_state_unchanged() {
        let mut session = session_in_state(TurnState::Idle);
        assert!(!session.transition(TurnState::Thinking));
        assert_eq!(session.state, TurnState::Idle);
    }

    #[test]
    fn legal_transition_is_applied() {
        let mut session = session_in_state(TurnState::Idle);
        assert!(session.transition(TurnState::UserSpeaking));
        assert_eq!(session.state, TurnState::UserSpeaking);
    }

    #[tokio::test]
    async fn second_trigger_while_busy_is_queued_not_dropped() {
        let session = session_in_state(TurnState::Idle);
        let permit = session.deps.locks.try_acquire(&session.call_id).unwrap();
        let mut session = session;
        let (farewell_tx, _farewell_rx) = mpsc::channel(1);
        session.transcript_acc = "a trailing utterance".into();
        assert!(session.start_turn(farewell_tx).is_none());
        assert!(session.pending_waiter.is_some());
        drop(permit);
        let queued = session
            .requeue_rx
            .as_mut()
            .unwrap()
            .recv()
            .await
            .expect("queued turn should rejoin once the lock frees up");
        assert_eq!(queued.text, "a trailing utterance");
    }
}
