//! WebSocket endpoint.
//!
//! Every connection gets a fresh id and an unbounded outbound channel. The
//! socket task forwards whatever the room store queues on that channel and
//! feeds inbound frames to the router. Malformed frames are logged and
//! dropped without a reply.

use std::collections::HashSet;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use skync_core::{ClientMessage, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::router::Outcome;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!(%connection_id, "connection opened");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut joined: HashSet<RoomId> = HashSet::new();

    let _ = tx.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
    });

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match ClientMessage::from_json(text.as_str()) {
                        Ok(msg) => {
                            if let Outcome::Joined { room_id, .. } = state.router.route(&connection_id, &tx, msg) {
                                joined.insert(room_id);
                            }
                        }
                        Err(e) => warn!(%connection_id, error = %e, "dropping malformed frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%connection_id, error = %e, "websocket error");
                        break;
                    }
                }
            }

            Some(outgoing) = rx.recv() => {
                let json = match outgoing.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(%connection_id, error = %e, "failed to encode frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    for room_id in &joined {
        state.router.disconnect(room_id, &connection_id);
    }
    info!(%connection_id, rooms = joined.len(), "connection closed");
}
