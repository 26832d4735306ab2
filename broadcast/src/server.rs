//! WebSocket endpoint bridging subscriber sockets to the registry.
//!
//! Each accepted socket gets a registry entry and a dedicated writer
//! task draining its channel; the read half only watches for close
//! frames and pings. Disconnects (either direction) unregister the
//! connection.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use clashcast_types::Clock;

use crate::registry::Broadcaster;

/// Shared state for the WebSocket routes.
#[derive(Clone)]
pub struct WsState {
    pub broadcaster: Arc<Broadcaster>,
    pub clock: Arc<dyn Clock>,
}

/// Build a router exposing `GET /ws`.
pub fn ws_router(broadcaster: Arc<Broadcaster>, clock: Arc<dyn Clock>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(WsState { broadcaster, clock })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (id, mut events) = state.broadcaster.register(state.clock.now());
    let (mut sink, mut stream) = socket.split();

    // Writer: drain the registry channel into the socket. A failed
    // write means the client is gone; stop and let cleanup run.
    let writer = tokio::spawn(async move {
        while let Some(payload) = events.recv().await {
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Reader: watch for close/ping; anything else is ignored (clients
    // only listen on this channel).
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => {
                debug!(connection = id.0, "client sent close frame");
                break;
            }
            Ok(_) => {
                // Pings, pongs, stray text: all just liveness.
                state.broadcaster.touch(id, state.clock.now());
            }
            Err(e) => {
                warn!(connection = id.0, error = %e, "websocket receive error");
                break;
            }
        }
    }

    state.broadcaster.unregister(id);
    writer.abort();
    debug!(connection = id.0, "websocket connection closed");
}
