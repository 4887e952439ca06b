//! The WebSocket multiplexer.
//!
//! One task per connection: frames come in, get decoded and rate-limited,
//! and are handed to the conductor; outbound envelopes go out over a
//! channel so the conductor loop never touches the socket directly. The
//! connection's session is pinned to whatever `sessionId` its first frame
//! names — every later frame naming a different session is rejected.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use conductor_domain::trace::TraceEvent;
use conductor_protocol::{event_type, payload, Envelope};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::conductor;
use crate::state::AppState;

/// Outbound channel capacity; the writer task drains this into the socket
/// as fast as it can, so this only needs to absorb bursts.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Envelope>(OUTBOUND_CHANNEL_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(envelope) = outbound_rx.recv().await {
            let bytes = envelope.encode();
            let text = String::from_utf8_lossy(&bytes).into_owned();
            if sink.send(Message::Text(text)).await.is_err() {
                tracing::debug!("websocket send failed, closing writer");
                break;
            }
        }
    });

    let mut pinned_session_id: Option<String> = None;
    let mut limiter = state.sessions.create_rate_limiter();

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!(%err, "websocket read error, closing connection");
                break;
            }
        };

        let bytes = match message {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let envelope = match Envelope::decode(&bytes, state.config.server.max_event_bytes) {
            Ok(env) => env,
            Err(err) => {
                let target_session = pinned_session_id.clone().unwrap_or_default();
                emit_protocol_error(&outbound_tx, &target_session, "invalid_event", &err.to_string())
                    .await;
                continue;
            }
        };

        match &pinned_session_id {
            None => pinned_session_id = Some(envelope.session_id.clone()),
            Some(pinned) if pinned != &envelope.session_id => {
                emit_protocol_error(
                    &outbound_tx,
                    pinned,
                    "session_mismatch",
                    &format!(
                        "connection is pinned to \"{pinned}\", frame named \"{}\"",
                        envelope.session_id
                    ),
                )
                .await;
                continue;
            }
            _ => {}
        }

        if !limiter.allow(std::time::Instant::now()) {
            TraceEvent::RateLimited {
                session_id: envelope.session_id.clone(),
            }
            .emit();
            let payload = serde_json::to_value(payload::ErrorPayload {
                code: "rate_limited".into(),
                message: None,
            })
            .expect("payload struct always serializes");
            let _ = outbound_tx
                .send(Envelope::make(event_type::ERROR, &envelope.session_id, payload))
                .await;
            continue;
        }

        conductor::handle_envelope(&state, envelope, outbound_tx.clone()).await;
    }

    if let Some(session_id) = pinned_session_id {
        // The session outlives the socket so a reconnect with the same id
        // can resume it; only an explicit eviction drains its resolvers.
        tracing::info!(%session_id, "connection closed, session retained");
    }
    writer.abort();
}

async fn emit_protocol_error(
    outbound: &mpsc::Sender<Envelope>,
    session_id: &str,
    code: &str,
    message: &str,
) {
    let payload = serde_json::to_value(payload::ErrorPayload {
        code: code.to_string(),
        message: Some(message.to_string()),
    })
    .expect("payload struct always serializes");
    let _ = outbound
        .send(Envelope::make(event_type::ERROR, session_id, payload))
        .await;
}
