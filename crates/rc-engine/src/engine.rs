//! Conversation engine (spec §4.6, C6): composes the LLM streaming client
//! and the tool router to run one user turn — streamed assistant text
//! with at most `max_calls_per_turn` in-turn tool calls, flushed to C3 on
//! sentence boundaries, cancellable mid-stream for barge-in.
//!
//! Grounded on `runtime/turn.rs`'s `run_turn`/`run_turn_inner` tool loop:
//! cancellation checked both before and during each stream, tool calls
//! assembled from start/delta/finished events, dispatched after the
//! stream ends rather than inline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rc_domain::{
    ConversationTurn, Error, Message, Result, StreamEvent, TenantSnapshot, ToolCall,
    ToolCallRecord, ToolErrorTag, ToolOutcome, TurnRole,
};
use rc_llm::{ChatRequest, LlmProvider};
use rc_tools::{build_tool_definitions, ToolRouter};
use rc_tts::{SentenceBuffer, TtsCommand};

/// A synthetic tool result surfaced once the turn's tool budget (spec §9
/// Open Question 2) is exhausted, so the model finalizes an answer instead
/// of looping forever waiting on a call that will never be dispatched.
const BUDGET_EXHAUSTED_MESSAGE: &str =
    "tool budget exhausted for this turn; answer with what is already known";

/// Inputs the engine needs to run one user turn. `history` already
/// contains the triggering user turn, sealed by the call session before
/// invoking the engine — the engine only ever appends, never mutates.
pub struct EngineInput {
    pub tenant: TenantSnapshot,
    pub system_prompt: String,
    pub history: Vec<ConversationTurn>,
    pub next_seq: u64,
}

/// Turns to append to the session's history, and whether the run ended
/// early because `cancel` fired (barge-in or call teardown).
pub struct EngineOutput {
    pub turns: Vec<ConversationTurn>,
    pub cancelled: bool,
    /// Wall-clock instant the first assistant token of this run arrived,
    /// for the call's `first_llm_token_ms` metric (spec §3). `Instant` is
    /// a single global monotonic clock, so the session can diff this
    /// against its own start instant despite the two living in different
    /// tasks.
    pub first_token_at: Option<Instant>,
}

pub async fn run_engine(
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRouter>,
    tts_tx: mpsc::Sender<TtsCommand>,
    input: EngineInput,
    cancel: CancellationToken,
) -> Result<EngineOutput> {
    let EngineInput {
        tenant,
        system_prompt,
        history,
        mut next_seq,
    } = input;

    let mut messages = vec![Message::system(&system_prompt)];
    messages.extend(history.iter().map(ConversationTurn::to_message));

    let tool_defs = build_tool_definitions();
    let max_calls = tenant.tool_policy.max_calls_per_turn;
    let total_budget = tenant.tool_policy.total_tool_budget;
    let per_tool_timeout = tenant.tool_policy.per_tool_timeout;

    let mut sentence_buf = SentenceBuffer::new(&rc_domain::config::TtsConfig::default());
    let mut new_turns = Vec::new();
    let mut tool_calls_made: u32 = 0;
    let mut tool_elapsed = Duration::ZERO;
    let mut first_token_at: Option<Instant> = None;

    for round in 0..MAX_ROUND_TRIPS {
        if cancel.is_cancelled() {
            return Ok(EngineOutput {
                turns: new_turns,
                cancelled: true,
                first_token_at,
            });
        }

        let req = ChatRequest {
            messages: messages.clone(),
            tools: tool_defs.clone(),
            temperature: None,
            max_tokens: None,
            model: None,
        };

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(EngineOutput { turns: new_turns, cancelled: true, first_token_at });
            }
            r = provider.chat_stream(req) => r?,
        };

        let mut text_buf = String::new();
        let mut pending_calls: Vec<ToolCall> = Vec::new();
        let mut tc_bufs: HashMap<String, (String, String)> = HashMap::new();
        let mut was_cancelled = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    was_cancelled = true;
                    break;
                }
                next = stream.next() => {
                    match next {
                        None => break,
                        Some(Err(e)) => return Err(e),
                        Some(Ok(StreamEvent::Token { text })) => {
                            if first_token_at.is_none() {
                                first_token_at = Some(Instant::now());
                            }
                            text_buf.push_str(&text);
                            if let Some(fragment) = sentence_buf.push(&text) {
                                let _ = tts_tx.send(TtsCommand::SpeakFragment(fragment)).await;
                            }
                        }
                        Some(Ok(StreamEvent::ToolCallStarted { call_id, tool_name })) => {
                            tc_bufs.insert(call_id, (tool_name, String::new()));
                        }
                        Some(Ok(StreamEvent::ToolCallDelta { call_id, delta })) => {
                            if let Some((_, args)) = tc_bufs.get_mut(&call_id) {
                                args.push_str(&delta);
                            }
                        }
                        Some(Ok(StreamEvent::ToolCallFinished { call_id, tool_name, arguments })) => {
                            pending_calls.push(ToolCall { call_id: call_id.clone(), tool_name, arguments });
                            tc_bufs.remove(&call_id);
                        }
                        Some(Ok(StreamEvent::Done { .. })) => break,
                        Some(Ok(StreamEvent::Error { message })) => {
                            return Err(Error::Provider { provider: provider.provider_id().to_string(), message });
                        }
                    }
                }
            }
        }

        if was_cancelled {
            sentence_buf.drain(); // unsent fragment is discarded, not spoken
            if !text_buf.is_empty() {
                new_turns.push(seal_turn(
                    &mut next_seq,
                    TurnRole::Assistant,
                    text_buf,
                    Vec::new(),
                    true,
                ));
            }
            return Ok(EngineOutput {
                turns: new_turns,
                cancelled: true,
                first_token_at,
            });
        }

        // Providers that never send a `ToolCallFinished` (start+delta only)
        // leave their call assembled in `tc_bufs`; malformed or empty
        // argument JSON defaults to an empty object rather than failing
        // the whole turn over one bad call.
        for (call_id, (tool_name, args_str)) in tc_bufs.drain() {
            let arguments = if args_str.trim().is_empty() {
                serde_json::Value::Object(Default::default())
            } else {
                serde_json::from_str(&args_str).unwrap_or_else(|_| {
                    tracing::warn!(call_id, tool_name, "malformed tool call arguments, using {{}}");
                    serde_json::Value::Object(Default::default())
                })
            };
            pending_calls.push(ToolCall {
                call_id,
                tool_name,
                arguments,
            });
        }

        if pending_calls.is_empty() {
            if let Some(fragment) = sentence_buf.drain() {
                let _ = tts_tx.send(TtsCommand::SpeakFragment(fragment)).await;
            }
            let _ = tts_tx.send(TtsCommand::Flush).await;
            new_turns.push(seal_turn(
                &mut next_seq,
                TurnRole::Assistant,
                text_buf,
                Vec::new(),
                false,
            ));
            return Ok(EngineOutput {
                turns: new_turns,
                cancelled: false,
                first_token_at,
            });
        }

        // Emission pauses for the round trip: no more tokens arrive until
        // the follow-up request below. The requesting turn is sealed with
        // an empty `tool_calls` placeholder now (seq order must stay
        // ascending) and the records are attached once every call in this
        // batch has resolved.
        messages.push(Message::assistant_tool_request(&text_buf, &pending_calls));
        let assistant_seq = next_seq;
        new_turns.push(seal_turn(
            &mut next_seq,
            TurnRole::Assistant,
            text_buf,
            Vec::new(),
            false,
        ));

        let mut records = Vec::with_capacity(pending_calls.len());
        for call in &pending_calls {
            if cancel.is_cancelled() {
                break;
            }

            // The model never streams the tenant id itself (spec §4.6: "invoke
            // C5 with the tenant id injected"); inject it into the argument
            // object here so the router's tenant check passes for a
            // legitimately dispatched call instead of rejecting every real
            // call with `SchemaError`.
            let mut args = call.arguments.clone();
            match &mut args {
                serde_json::Value::Object(map) => {
                    map.insert(
                        "tenant".to_string(),
                        serde_json::Value::String(tenant.tenant_id.clone()),
                    );
                }
                _ => args = serde_json::json!({ "tenant": tenant.tenant_id }),
            }

            let budget_exhausted = tool_calls_made >= max_calls || tool_elapsed >= total_budget;

            let (outcome, latency_ms) = if budget_exhausted {
                (
                    ToolOutcome::Error {
                        tag: ToolErrorTag::Upstream,
                        message: BUDGET_EXHAUSTED_MESSAGE.into(),
                    },
                    0,
                )
            } else {
                let start = Instant::now();
                let outcome = tools
                    .invoke(&call.tool_name, &args, &tenant, per_tool_timeout)
                    .await;
                let elapsed = start.elapsed();
                tool_elapsed += elapsed;
                tool_calls_made += 1;
                (outcome, elapsed.as_millis() as u64)
            };

            let result_text = outcome_to_message(&outcome);
            if matches!(outcome, ToolOutcome::Ok { .. }) {
                messages.push(Message::tool_result(&call.call_id, &result_text));
            } else {
                messages.push(Message::tool_error(&call.call_id, &result_text));
            }

            new_turns.push(ConversationTurn {
                seq: next_seq,
                role: TurnRole::ToolResult,
                content: result_text,
                tool_calls: Vec::new(),
                timestamp: Utc::now(),
                interrupted: false,
            });
            next_seq += 1;

            records.push(ToolCallRecord {
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                arguments: args,
                outcome,
                latency_ms,
            });
        }

        if let Some(assistant_turn) = new_turns.iter_mut().find(|t| t.seq == assistant_seq) {
            assistant_turn.tool_calls = records;
        }

        if cancel.is_cancelled() {
            return Ok(EngineOutput {
                turns: new_turns,
                cancelled: true,
                first_token_at,
            });
        }

        if round == MAX_ROUND_TRIPS - 1 {
            tracing::warn!(round, "engine hit the round-trip cap, ending turn early");
        }
    }

    Ok(EngineOutput {
        turns: new_turns,
        cancelled: false,
        first_token_at,
    })
}

/// Hard ceiling on LLM round trips within one turn, independent of the
/// tenant's tool-call budget — a backstop against a model that keeps
/// requesting tools after its budget is already exhausted.
const MAX_ROUND_TRIPS: u32 = 8;

fn seal_turn(
    next_seq: &mut u64,
    role: TurnRole,
    content: String,
    tool_calls: Vec<ToolCallRecord>,
    interrupted: bool,
) -> ConversationTurn {
    let turn = ConversationTurn {
        seq: *next_seq,
        role,
        content,
        tool_calls,
        timestamp: Utc::now(),
        interrupted,
    };
    *next_seq += 1;
    turn
}

fn outcome_to_message(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Ok { payload } => payload.to_string(),
        ToolOutcome::Error { tag, message } => format!("{tag:?}: {message}"),
        ToolOutcome::Timeout => "timeout: tool call did not respond in time".to_string(),
    }
}
