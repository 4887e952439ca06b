//! The conductor service — the heart of the system.
//!
//! Dispatches one inbound [`Envelope`] at a time per session and, for a
//! finalized transcript, drives the multi-round tool-use loop: ask the
//! provider, either dispatch tools and suspend on each `tool.result` or
//! stream text back as speech, repeating until text is produced or the
//! round cap is hit.

use std::sync::Arc;
use std::time::Duration;

use conductor_domain::tool::Turn;
use conductor_domain::trace::TraceEvent;
use conductor_protocol::{event_type, payload, Envelope};
use conductor_sessions::Session;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::state::AppState;

/// Bound on tool-use rounds per transcript.
const MAX_TOOL_ROUNDS: usize = 8;
/// Wait for a dispatched tool call to resolve before synthesizing a
/// timeout.
const TOOL_RESULT_TIMEOUT_MS: u64 = 30_000;

type SessionHandle = Arc<Mutex<Session>>;

/// Build an envelope payload from a typed view, panicking only if the type
/// itself cannot serialize (it always can — these are plain data).
fn payload_value<T: serde::Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).expect("payload struct always serializes")
}

/// Deliver `envelope` to the connection's outbound channel. A closed
/// socket is tolerated: the failure is logged and the caller proceeds.
async fn emit(outbound: &mpsc::Sender<Envelope>, envelope: Envelope) {
    if outbound.send(envelope).await.is_err() {
        tracing::debug!("outbound channel closed, dropping envelope");
    }
}

async fn emit_error(
    outbound: &mpsc::Sender<Envelope>,
    session_id: &str,
    code: &str,
    message: Option<String>,
) {
    let payload = payload_value(&payload::ErrorPayload {
        code: code.to_string(),
        message,
    });
    emit(outbound, Envelope::make(event_type::ERROR, session_id, payload)).await;
}

/// Emit a server-originated `tool.call` directed at the client's
/// conversation-state / speech machinery (`convo.setState`,
/// `convo.appendMessage`, `tts.speak`). These control calls are recorded
/// as pending like any other, but the conductor never suspends on them —
/// the client is expected to acknowledge, but the loop proceeds
/// regardless.
async fn emit_control(
    outbound: &mpsc::Sender<Envelope>,
    session: &SessionHandle,
    session_id: &str,
    name: &str,
    arguments: Value,
) {
    let call_id = uuid::Uuid::new_v4().to_string();
    {
        let mut s = session.lock();
        s.register_pending(call_id.clone(), name);
    }
    let payload = payload_value(&payload::ToolCall {
        call_id,
        name: name.to_string(),
        arguments: arguments.to_string(),
    });
    emit(outbound, Envelope::make(event_type::TOOL_CALL, session_id, payload)).await;
}

/// Register a resolver for `call_id` and suspend until either a matching
/// `tool.result` fires it or `timeout_ms` elapses. Either way,
/// `pending_tool_calls` no longer contains `call_id` once this returns.
async fn wait_for_tool_result(
    session: &SessionHandle,
    call_id: &str,
    timeout_ms: u64,
) -> (Option<String>, Option<String>) {
    let (tx, rx) = oneshot::channel();
    {
        let mut s = session.lock();
        s.register_resolver(call_id.to_string(), tx);
    }

    match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
        Ok(Ok(resolution)) => resolution,
        Ok(Err(_)) => {
            // Resolver sender dropped without firing (e.g. session evicted
            // mid-wait) — pending_tool_calls was already cleared by the
            // evictor.
            (None, Some("tool_result_timeout".into()))
        }
        Err(_) => {
            let mut s = session.lock();
            s.drop_resolver(call_id);
            s.pending_tool_calls.remove(call_id);
            TraceEvent::ToolTimedOut {
                session_id: s.session_id.clone(),
                call_id: call_id.to_string(),
            }
            .emit();
            (None, Some("tool_result_timeout".into()))
        }
    }
}

/// Dispatch one inbound envelope: `session.start`, `user.audio.transcript.final`,
/// `tool.result`, `audio.output.interrupted`, or `agent.completed`.
pub async fn handle_envelope(state: &AppState, envelope: Envelope, outbound: mpsc::Sender<Envelope>) {
    let session_id = envelope.session_id.clone();

    match envelope.event_type.as_str() {
        event_type::SESSION_START => {
            let parsed = serde_json::from_value::<payload::SessionStart>(envelope.payload).ok();
            let session = state.sessions.get_or_create(&session_id);
            {
                let mut s = session.lock();
                if s.history.is_empty() {
                    s.append_turn(Turn::system(crate::catalog::SYSTEM_DIRECTIVE));
                }
                if s.github_token.is_none() {
                    s.github_token = parsed.and_then(|p| p.github_token);
                }
            }
            let payload = payload_value(&payload::SessionStarted {
                session_id: session_id.clone(),
            });
            emit(
                &outbound,
                Envelope::make(event_type::SESSION_STARTED, &session_id, payload),
            )
            .await;
        }

        event_type::USER_AUDIO_TRANSCRIPT_FINAL => {
            let text = serde_json::from_value::<payload::UserTranscriptFinal>(envelope.payload)
                .map(|p| p.text)
                .unwrap_or_default()
                .trim()
                .to_string();
            if text.is_empty() {
                emit_error(&outbound, &session_id, "invalid_transcript", None).await;
                return;
            }
            let state = state.clone();
            tokio::spawn(async move {
                conductor_loop(&state, session_id, text, outbound, false).await;
            });
        }

        event_type::TOOL_RESULT => {
            let Ok(parsed) = serde_json::from_value::<payload::ToolResult>(envelope.payload) else {
                tracing::debug!(%session_id, "malformed tool.result, dropping");
                return;
            };
            let Some(session) = state.sessions.get(&session_id) else {
                tracing::debug!(%session_id, call_id = %parsed.call_id, "tool.result for unknown session, dropping");
                return;
            };
            let fired = {
                let mut s = session.lock();
                s.resolve_tool_result(&parsed.call_id, parsed.result, parsed.error)
            };
            TraceEvent::ToolResolved {
                session_id: session_id.clone(),
                call_id: parsed.call_id.clone(),
                success: fired,
            }
            .emit();
            if !fired {
                TraceEvent::ToolResultDroppedUnknownCall {
                    session_id,
                    call_id: parsed.call_id,
                }
                .emit();
            }
        }

        event_type::AUDIO_OUTPUT_INTERRUPTED => {
            let reason = serde_json::from_value::<payload::AudioOutputInterrupted>(envelope.payload)
                .map(|p| p.reason)
                .unwrap_or_else(|_| "unspecified".into());
            tracing::info!(%session_id, %reason, "audio output interrupted by client");
        }

        event_type::AGENT_COMPLETED => {
            let Ok(parsed) = serde_json::from_value::<payload::AgentCompleted>(envelope.payload)
            else {
                tracing::debug!(%session_id, "malformed agent.completed, dropping");
                return;
            };
            let label = parsed.name.unwrap_or_else(|| parsed.agent_id.clone());
            let mut directive = format!(
                "The external agent \"{label}\" (id {}) reached status \"{}\".",
                parsed.agent_id, parsed.status
            );
            if let Some(summary) = parsed.summary {
                directive.push_str(&format!(" Its summary: {summary}."));
            }
            directive.push_str(" Summarize the outcome for the user in one or two sentences.");

            let state = state.clone();
            tokio::spawn(async move {
                conductor_loop(&state, session_id, directive, outbound, true).await;
            });
        }

        other => {
            tracing::debug!(%session_id, event_type = %other, "unrecognized event type, ignored");
        }
    }
}

/// The multi-round tool-use loop for one transcript.
async fn conductor_loop(
    state: &AppState,
    session_id: String,
    text: String,
    outbound: mpsc::Sender<Envelope>,
    suppress_user_message: bool,
) {
    let session = state.sessions.get_or_create(&session_id);

    {
        let mut s = session.lock();
        s.transcript_count += 1;
        s.recent_transcript_trace.clear();
        s.append_turn(Turn::user(text.clone()));
    }

    emit_control(
        &outbound,
        &session,
        &session_id,
        "convo.setState",
        json!({ "state": "thinking" }),
    )
    .await;

    if !suppress_user_message {
        emit_control(
            &outbound,
            &session,
            &session_id,
            "convo.appendMessage",
            json!({ "role": "user", "text": text, "isPartial": false }),
        )
        .await;
    }

    for _round in 0..MAX_TOOL_ROUNDS {
        let history = session.lock().history.clone();
        let provider = state.llm.active();

        let started = std::time::Instant::now();
        let response = provider.respond(&history, &state.tools).await;

        match response {
            Err(err) => {
                let message = err.to_string();
                TraceEvent::LlmFailed {
                    provider: provider.provider_id().to_string(),
                    message: message.clone(),
                }
                .emit();
                emit_error(&outbound, &session_id, "model_provider_failed", Some(message)).await;
                emit_control(
                    &outbound,
                    &session,
                    &session_id,
                    "convo.setState",
                    json!({ "state": "idle" }),
                )
                .await;
                return;
            }
            Ok(resp) => {
                TraceEvent::LlmRequest {
                    provider: provider.provider_id().to_string(),
                    model: state.config.llm.model_id.clone(),
                    streaming: resp.tool_calls.is_empty(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    tool_calls: resp.tool_calls.len(),
                }
                .emit();

                if !resp.tool_calls.is_empty() {
                    {
                        let mut s = session.lock();
                        s.append_turn(Turn::assistant_tool_calls(resp.tool_calls.clone()));
                    }

                    for call in resp.tool_calls {
                        let call_id = uuid::Uuid::new_v4().to_string();
                        let arguments =
                            serde_json::to_string(&call.input).unwrap_or_else(|_| "{}".into());
                        {
                            let mut s = session.lock();
                            s.register_pending(call_id.clone(), call.name.clone());
                        }
                        TraceEvent::ToolDispatched {
                            session_id: session_id.clone(),
                            call_id: call_id.clone(),
                            tool_name: call.name.clone(),
                        }
                        .emit();
                        emit(
                            &outbound,
                            Envelope::make(
                                event_type::TOOL_CALL,
                                &session_id,
                                payload_value(&payload::ToolCall {
                                    call_id: call_id.clone(),
                                    name: call.name.clone(),
                                    arguments,
                                }),
                            ),
                        )
                        .await;

                        let (result, error) =
                            wait_for_tool_result(&session, &call_id, TOOL_RESULT_TIMEOUT_MS).await;
                        let content = result.unwrap_or_else(|| {
                            format!("Error: {}", error.unwrap_or_else(|| "unknown".into()))
                        });

                        let mut s = session.lock();
                        s.append_turn(Turn::tool(call.id.clone(), call.name.clone(), content));
                    }
                    // Re-ask the provider with the tool results now visible.
                    continue;
                }

                // Text response: stream fragments as cumulative-prefix
                // partials, then finalize.
                let mut chunks = resp.chunks;
                let mut cumulative = String::new();
                while let Some(fragment) = chunks.next().await {
                    cumulative.push_str(&fragment);
                    emit(
                        &outbound,
                        Envelope::make(
                            event_type::ASSISTANT_SPEECH_PARTIAL,
                            &session_id,
                            payload_value(&payload::AssistantSpeechPartial {
                                text: cumulative.clone(),
                            }),
                        ),
                    )
                    .await;
                }

                let mut final_text = cumulative.trim_end().to_string();
                if final_text.is_empty() {
                    final_text = resp.full_text.trim_end().to_string();
                }

                emit(
                    &outbound,
                    Envelope::make(
                        event_type::ASSISTANT_SPEECH_FINAL,
                        &session_id,
                        payload_value(&payload::AssistantSpeechFinal {
                            text: final_text.clone(),
                        }),
                    ),
                )
                .await;

                {
                    let mut s = session.lock();
                    s.append_turn(Turn::assistant_text(final_text.clone()));
                }

                emit_control(
                    &outbound,
                    &session,
                    &session_id,
                    "convo.appendMessage",
                    json!({ "role": "assistant", "text": final_text, "isPartial": false }),
                )
                .await;
                emit_control(
                    &outbound,
                    &session,
                    &session_id,
                    "convo.setState",
                    json!({ "state": "speaking" }),
                )
                .await;
                emit_control(
                    &outbound,
                    &session,
                    &session_id,
                    "tts.speak",
                    json!({ "text": final_text }),
                )
                .await;
                emit_control(
                    &outbound,
                    &session,
                    &session_id,
                    "convo.setState",
                    json!({ "state": "idle" }),
                )
                .await;
                return;
            }
        }
    }

    emit_error(&outbound, &session_id, "tool_round_limit_exceeded", None).await;
    emit_control(
        &outbound,
        &session,
        &session_id,
        "convo.setState",
        json!({ "state": "idle" }),
    )
    .await;
}
