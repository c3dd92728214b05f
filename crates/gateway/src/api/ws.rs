//! Per-discussion event relay (spec §6 "Event channel").
//!
//! A client upgrades, immediately receives the discussion's buffered
//! history (oldest first), then live events as they're published. The
//! relay is one-directional: the server never expects inbound frames
//! beyond the WS-level ping/pong axum handles for us.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

pub async fn discussion_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, id))
}

async fn handle_socket(socket: WebSocket, state: AppState, discussion_id: String) {
    let (mut sink, mut stream) = socket.split();

    for envelope in state.bus.recent(&discussion_id) {
        if send(&mut sink, &envelope).await.is_err() {
            return;
        }
    }

    let mut rx = state.bus.subscribe(&discussion_id);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(envelope) => {
                        if send(&mut sink, &envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }

    tracing::debug!(discussion_id = %discussion_id, "event subscriber disconnected");
}

async fn send(
    sink: &mut (impl SinkExt<Message> + Unpin),
    envelope: &discuss_domain::event::EventEnvelope,
) -> Result<(), ()> {
    let json = serde_json::to_string(envelope).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}
