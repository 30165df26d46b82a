//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::dispatch::{dispatch, on_disconnect, Delivery};
use crate::ws::protocol::{
    decode_client_msg, ConnectionId, ErrorCode, ProtocolError, ServerMsg, MAX_TRANSPORT_BYTES,
};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if !state.config.origin_allowed(origin) {
        warn!(origin = ?origin, "WebSocket upgrade rejected: origin not allowed");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    ws.max_message_size(MAX_TRANSPORT_BYTES)
        .max_frame_size(MAX_TRANSPORT_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id: ConnectionId = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut outbox = state.connections.register(connection_id);
    state.connections.send(
        connection_id,
        ServerMsg::Connected {
            player_id: connection_id,
        },
    );

    // Writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!(connection_id = %connection_id, error = %e, "Failed to encode message");
                    continue;
                }
            };
            if let Err(e) = ws_sink.send(Message::Text(json)).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let rate_limiter = ConnectionRateLimiter::new(state.rate_limit);

    // Reader loop: WebSocket -> room store
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !admit(&state, &rate_limiter, connection_id) {
                    continue;
                }

                match decode_client_msg(&text) {
                    Ok(msg) => deliver(&state, dispatch(&state.rooms, connection_id, msg)),
                    Err(e) => reject_frame(&state, connection_id, e),
                }
            }
            Ok(Message::Binary(_)) => {
                if !admit(&state, &rate_limiter, connection_id) {
                    continue;
                }
                reject_frame(&state, connection_id, ProtocolError::Binary);
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received control frame");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    deliver(&state, on_disconnect(&state.rooms, connection_id));
    state.connections.unregister(connection_id);
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Charge one message against the budget; over budget gets `RATE_LIMITED`
fn admit(state: &AppState, limiter: &ConnectionRateLimiter, connection_id: ConnectionId) -> bool {
    if limiter.check_message() {
        return true;
    }
    warn!(connection_id = %connection_id, "Rate limited message");
    state.connections.send(
        connection_id,
        ServerMsg::error(ErrorCode::RateLimited, "Too many messages"),
    );
    false
}

fn reject_frame(state: &AppState, connection_id: ConnectionId, err: ProtocolError) {
    warn!(connection_id = %connection_id, error = %err, "Invalid message");
    state.connections.send(
        connection_id,
        ServerMsg::error(ErrorCode::InvalidMessage, err.to_string()),
    );
}

/// Hand each frame to its recipient's writer task
pub(crate) fn deliver(state: &AppState, deliveries: Vec<Delivery>) {
    for Delivery { to, msg } in deliveries {
        state.connections.send(to, msg);
    }
}
