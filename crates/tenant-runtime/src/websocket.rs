//! The `/events?user_id=<U|broadcast>` websocket subprotocol: the axum
//! upgrade handler, the [`WebsocketSink`] adapter registered with the bus,
//! and the small client-message protocol (`ping`, `subscribe`,
//! `get_history`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tenant_bus_core::{Event, SinkError, WebsocketSink};
use tenant_types::UserId;

use crate::ServiceState;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    user_id: String,
}

/// One client→server message, per spec.md §6.3.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    Subscribe { events: Vec<String> },
    GetHistory {
        event_type: Option<String>,
        limit: Option<usize>,
    },
}

/// One server→client message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage<'a> {
    Connected { user_id: &'a str },
    Pong,
    Subscribed { events: &'a [String] },
    History { events: Vec<Event> },
    Error { message: String },
    Event { event: Event },
}

/// A [`WebsocketSink`] that forwards bus events onto an axum socket's
/// outbound half over an internal mpsc channel.
struct AxumSink {
    id: u64,
    tx: mpsc::UnboundedSender<Message>,
}

impl WebsocketSink for AxumSink {
    fn id(&self) -> u64 {
        self.id
    }

    fn send(&self, event: &Event) -> Result<(), SinkError> {
        let payload = match serde_json::to_string(&ServerMessage::Event {
            event: event.clone(),
        }) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize event for websocket fan-out");
                return Err(SinkError::Terminal);
            }
        };
        self.tx
            .send(Message::Text(payload))
            .map_err(|_| SinkError::Terminal)
    }
}

/// `GET /events?user_id=<U|broadcast>` — upgrade to a websocket and start
/// fanning out bus events for `user_id` (or every event, for `broadcast`).
pub async fn handler(
    ws: WebSocketUpgrade,
    Query(query): Query<EventsQuery>,
    State(state): State<ServiceState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.user_id))
}

async fn handle_socket(socket: WebSocket, state: ServiceState, user_id_raw: String) {
    let user_id = if user_id_raw == "broadcast" {
        None
    } else {
        match UserId::new(user_id_raw) {
            Ok(id) => Some(id),
            Err(err) => {
                debug!(error = %err, "rejected websocket connection with invalid user_id");
                return;
            }
        }
    };

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let sink_id = NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed);
    state
        .bus
        .register_websocket(Arc::new(AxumSink { id: sink_id, tx: tx.clone() }), user_id.clone())
        .await;

    let connected = serde_json::to_string(&ServerMessage::Connected {
        user_id: user_id.as_ref().map(UserId::as_str).unwrap_or("broadcast"),
    })
    .unwrap_or_default();
    let _ = tx.send(Message::Text(connected));

    let forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let reply = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => ServerMessage::Pong,
            Ok(ClientMessage::Subscribe { events }) => {
                let reply = serde_json::to_string(&ServerMessage::Subscribed { events: &events })
                    .unwrap_or_default();
                let _ = tx.send(Message::Text(reply));
                continue;
            }
            Ok(ClientMessage::GetHistory { event_type, limit }) => {
                let history = state
                    .bus
                    .history(event_type.as_deref(), user_id.as_ref(), limit.unwrap_or(50))
                    .await;
                ServerMessage::History { events: history }
            }
            Err(err) => ServerMessage::Error {
                message: err.to_string(),
            },
        };
        let payload = serde_json::to_string(&reply).unwrap_or_default();
        if tx.send(Message::Text(payload)).is_err() {
            break;
        }
    }

    state.bus.unregister_websocket(sink_id, user_id).await;
    forward_task.abort();
}
