//! WebSocket endpoint for the change feed.
//!
//! Clients hold one socket open and re-run their queries whenever an event
//! arrives; there is no manual polling. A client that lags far enough to
//! miss events is told to resync rather than replayed.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::domain::AuthenticatedUser;
use crate::AppState;
use shared::ChangeEvent;

/// GET /api/events: upgrade to WebSocket
pub async fn change_events(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let receiver = state.change_feed.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, receiver, user))
}

async fn forward_events(
    socket: WebSocket,
    mut receiver: broadcast::Receiver<ChangeEvent>,
    user: AuthenticatedUser,
) {
    info!("Change feed subscriber connected: {}", user.user_id);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize change event: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        skipped,
                        "Change feed subscriber lagged; advising resync"
                    );
                    if sink.send(Message::Text("{\"resync\":true}".to_string())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                // Inbound frames are ignored; the socket is one-way
                Some(Ok(_)) => continue,
                // Unmount or error: the subscriber has ceased interest
                _ => break,
            },
        }
    }

    info!("Change feed subscriber disconnected: {}", user.user_id);
}
