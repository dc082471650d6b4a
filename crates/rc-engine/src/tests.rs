use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rc_domain::{BoxStream, Result, StreamEvent, TenantSnapshot, ToolOutcome, TurnRole};
use rc_llm::{ChatRequest, LlmProvider};
use rc_tenant::{TenantCache, TenantStore};
use rc_tools::ToolRouter;
use rc_tts::TtsCommand;

use crate::engine::{run_engine, EngineInput};

/// Replays one scripted event sequence per `chat_stream` call, in order.
struct FakeProvider {
    scripts: Mutex<VecDeque<Vec<StreamEvent>>>,
}

impl FakeProvider {
    fn new(scripts: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for FakeProvider {
    async fn chat_stream(&self, _req: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let events = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::pin(futures_util::stream::iter(
            events.into_iter().map(Ok),
        )))
    }

    fn provider_id(&self) -> &str {
        "fake"
    }
}

fn token(text: &str) -> StreamEvent {
    StreamEvent::Token { text: text.into() }
}

fn done() -> StreamEvent {
    StreamEvent::Done {
        usage: None,
        finish_reason: Some("stop".into()),
    }
}

fn tenant_with_one_booking() -> (TenantSnapshot, Arc<ToolRouter>) {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(
        br#"
        [[tenant]]
        tenant_id = "acme-plumb"
        dialed_number = "+15551230000"
        display_name = "Acme Plumbing"
        max_calls_per_turn = 1

        [[tenant.bookings]]
        booking_id = "bk-1"
        customer_phone = "+15559990000"
        service = "Drain cleaning"
        starts_at = "2026-01-01T10:00:00Z"
        status = "confirmed"
        "#,
    )
    .unwrap();
    let store = TenantStore::load(f.path()).unwrap();
    let cache = Arc::new(TenantCache::new(store, Duration::from_secs(60)));
    let tenant = cache.resolve("acme-plumb", "+15551230000");
    (tenant, Arc::new(ToolRouter::new(cache)))
}

fn sink() -> (mpsc::Sender<TtsCommand>, mpsc::Receiver<TtsCommand>) {
    mpsc::channel(32)
}

#[tokio::test]
async fn plain_text_turn_seals_one_assistant_turn() {
    let (tenant, tools) = tenant_with_one_booking();
    let provider: Arc<dyn LlmProvider> = Arc::new(FakeProvider::new(vec![vec![
        token("Sure, "),
        token("we're open until five."),
        done(),
    ]]));
    let (tts_tx, _tts_rx) = sink();

    let out = run_engine(
        provider,
        tools,
        tts_tx,
        EngineInput {
            tenant,
            system_prompt: "be helpful".into(),
            history: Vec::new(),
            next_seq: 1,
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!out.cancelled);
    assert_eq!(out.turns.len(), 1);
    assert_eq!(out.turns[0].role, TurnRole::Assistant);
    assert!(out.turns[0].content.contains("five"));
    assert!(!out.turns[0].interrupted);
}

#[tokio::test]
async fn tool_call_round_trip_brackets_a_tool_result_turn() {
    let (tenant, tools) = tenant_with_one_booking();
    let provider: Arc<dyn LlmProvider> = Arc::new(FakeProvider::new(vec![
        vec![
            StreamEvent::ToolCallStarted {
                call_id: "c1".into(),
                tool_name: "get_latest_booking".into(),
            },
            StreamEvent::ToolCallFinished {
                call_id: "c1".into(),
                tool_name: "get_latest_booking".into(),
                arguments: serde_json::json!({"tenant": "acme-plumb", "customer_phone": "+15559990000"}),
            },
            done(),
        ],
        vec![token("Your drain cleaning is confirmed."), done()],
    ]));
    let (tts_tx, _tts_rx) = sink();

    let out = run_engine(
        provider,
        tools,
        tts_tx,
        EngineInput {
            tenant,
            system_prompt: "be helpful".into(),
            history: Vec::new(),
            next_seq: 1,
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!out.cancelled);
    assert_eq!(out.turns.len(), 3);
    assert_eq!(out.turns[0].role, TurnRole::Assistant);
    assert_eq!(out.turns[0].tool_calls.len(), 1);
    assert_eq!(out.turns[1].role, TurnRole::ToolResult);
    assert_eq!(out.turns[2].role, TurnRole::Assistant);
    assert!(out.turns[2].content.contains("confirmed"));
}

#[tokio::test]
async fn streamed_tool_call_args_accumulate_by_shared_call_id_and_get_tenant_injected() {
    // Mirrors the shape `ChatProvider` actually emits: `Started` carries the
    // provider's real id, argument fragments arrive as separate `Delta`
    // events under that same id, and there is no `Finished` event — the
    // engine has to assemble the call from `tc_bufs` on its own. The model
    // never supplies `tenant`; the engine must inject it before dispatch.
    let (tenant, tools) = tenant_with_one_booking();
    let provider: Arc<dyn LlmProvider> = Arc::new(FakeProvider::new(vec![
        vec![
            StreamEvent::ToolCallStarted {
                call_id: "call_1".into(),
                tool_name: "get_latest_booking".into(),
            },
            StreamEvent::ToolCallDelta {
                call_id: "call_1".into(),
                delta: "{\"customer_phone\":\"".into(),
            },
            StreamEvent::ToolCallDelta {
                call_id: "call_1".into(),
                delta: "+15559990000\"}".into(),
            },
            done(),
        ],
        vec![token("Found your booking."), done()],
    ]));
    let (tts_tx, _tts_rx) = sink();

    let out = run_engine(
        provider,
        tools,
        tts_tx,
        EngineInput {
            tenant,
            system_prompt: "be helpful".into(),
            history: Vec::new(),
            next_seq: 1,
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!out.cancelled);
    let assistant_turn = out
        .turns
        .iter()
        .find(|t| !t.tool_calls.is_empty())
        .expect("assistant turn with a dispatched tool call");
    let record = &assistant_turn.tool_calls[0];
    assert_eq!(record.arguments["customer_phone"], "+15559990000");
    assert_eq!(
        record.arguments["tenant"], "acme-plumb",
        "engine must inject the tenant id rather than rely on the model supplying it"
    );
    assert!(matches!(record.outcome, ToolOutcome::Ok { .. }));
}

#[tokio::test]
async fn budget_exhaustion_yields_synthetic_result_without_dispatching() {
    let (tenant, tools) = tenant_with_one_booking(); // max_calls_per_turn = 1
    let provider: Arc<dyn LlmProvider> = Arc::new(FakeProvider::new(vec![
        vec![
            StreamEvent::ToolCallFinished {
                call_id: "c1".into(),
                tool_name: "get_latest_booking".into(),
                arguments: serde_json::json!({"tenant": "acme-plumb", "customer_phone": "+15559990000"}),
            },
            done(),
        ],
        vec![
            StreamEvent::ToolCallFinished {
                call_id: "c2".into(),
                tool_name: "get_business_services".into(),
                arguments: serde_json::json!({"tenant": "acme-plumb"}),
            },
            done(),
        ],
        vec![token("All set."), done()],
    ]));
    let (tts_tx, _tts_rx) = sink();

    let out = run_engine(
        provider,
        tools,
        tts_tx,
        EngineInput {
            tenant,
            system_prompt: "be helpful".into(),
            history: Vec::new(),
            next_seq: 1,
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!out.cancelled);
    let second_tool_result = out
        .turns
        .iter()
        .filter(|t| t.role == TurnRole::ToolResult)
        .nth(1)
        .unwrap();
    assert!(second_tool_result.content.contains("budget exhausted"));
}

#[tokio::test]
async fn cancellation_before_any_tokens_commits_nothing() {
    let (tenant, tools) = tenant_with_one_booking();
    let provider: Arc<dyn LlmProvider> = Arc::new(FakeProvider::new(vec![vec![
        token("won't be seen"),
        done(),
    ]]));
    let (tts_tx, _tts_rx) = sink();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let out = run_engine(
        provider,
        tools,
        tts_tx,
        EngineInput {
            tenant,
            system_prompt: "be helpful".into(),
            history: Vec::new(),
            next_seq: 1,
        },
        cancel,
    )
    .await
    .unwrap();

    assert!(out.cancelled);
    assert!(out.turns.is_empty());
}

#[tokio::test]
async fn partial_text_on_cancellation_is_committed_as_interrupted() {
    let (tenant, tools) = tenant_with_one_booking();
    // A provider whose stream never resolves lets the cancellation branch
    // of the select win deterministically instead of racing a real token.
    struct HangingProvider;
    #[async_trait::async_trait]
    impl LlmProvider for HangingProvider {
        async fn chat_stream(
            &self,
            _req: ChatRequest,
        ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
            Ok(Box::pin(futures_util::stream::pending()))
        }
        fn provider_id(&self) -> &str {
            "hanging"
        }
    }
    let provider: Arc<dyn LlmProvider> = Arc::new(HangingProvider);
    let (tts_tx, _tts_rx) = sink();
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_clone.cancel();
    });

    let out = run_engine(
        provider,
        tools,
        tts_tx,
        EngineInput {
            tenant,
            system_prompt: "be helpful".into(),
            history: Vec::new(),
            next_seq: 1,
        },
        cancel,
    )
    .await
    .unwrap();

    assert!(out.cancelled);
    assert!(out.turns.is_empty());
}
