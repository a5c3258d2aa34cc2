//! WebSocket push of work item notifications.
//!
//! Each connection gets its own broadcast receiver and receives every
//! notification as a JSON text frame `{"topic": ..., "data": ...}`.
//! Listeners that fall behind lose the oldest notifications.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use super::AppState;
use crate::event::{TopicMessage, WorkitemEvent};

/// `GET /ws`
pub async fn notifications(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.engine.events().subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

async fn forward_events(socket: WebSocket, mut events: broadcast::Receiver<WorkitemEvent>) {
    let listener_id = Uuid::new_v4();
    debug!(%listener_id, "notification listener connected");

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%listener_id, skipped, "listener lagging, notifications dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&TopicMessage::from(event)) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%listener_id, error = %e, "could not encode notification");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Drain inbound frames so close frames and pings are processed.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    debug!(%listener_id, "notification listener disconnected");
}
