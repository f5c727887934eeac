use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::ws_types::WsMessage;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Comma-separated event kinds, e.g. `new_transaction,alert_triggered`.
    /// Absent or empty means every event.
    pub events: Option<String>,
}

/// Per-connection event selection.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    kinds: Option<HashSet<String>>,
}

impl EventFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        let kinds: HashSet<String> = raw
            .unwrap_or_default()
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            kinds: (!kinds.is_empty()).then_some(kinds),
        }
    }

    pub fn accepts(&self, event: &WsMessage) -> bool {
        self.kinds
            .as_ref()
            .map_or(true, |kinds| kinds.contains(event.kind()))
    }
}

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> impl IntoResponse {
    let filter = EventFilter::parse(q.events.as_deref());
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, filter: EventFilter) {
    let mut rx = state.bus.subscribe();
    tracing::info!(
        subscribers = state.bus.subscriber_count(),
        filtered = filter.kinds.is_some(),
        "Live feed client connected"
    );

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) if filter.accepts(&event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, event = event.kind(), "Failed to serialize event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Live feed client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Live feed client disconnected");
}
