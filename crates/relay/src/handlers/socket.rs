//! Per-connection WebSocket lifecycle
//!
//! `Connecting -> Open -> Closed`. On open the connection is registered and
//! hydrated; while open every text frame is run through the message service
//! and fanned out; on close it is unregistered.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppState;
use crate::models::{ErrorBody, InboundPayload, ServerFrame};
use crate::registry::{ConnectionHandle, ConnectionState, OUTBOUND_CAPACITY};

/// What happened to one inbound text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Accepted and broadcast to `delivered` connections
    Broadcast { id: String, delivered: usize },
    /// Rejected by validation, error sent to the sender only
    Rejected { code: &'static str },
    /// Not parseable, dropped silently
    Malformed,
    /// Arrived after the connection left `Open`, ignored
    Ignored,
}

/// GET / and GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let conn = ConnectionHandle::new(state.registry.next_id(), tx);
    let conn_id = conn.id();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                debug!("Connection {} send failed: {}", conn_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    open(&state, &conn);

    while conn.state() == ConnectionState::Open {
        let result = tokio::select! {
            result = stream.next() => result,
            _ = conn.closed() => break,
        };
        match result {
            Some(Ok(WsMessage::Text(text))) => {
                handle_text_frame(&state, &conn, text.as_str());
            }
            Some(Ok(WsMessage::Binary(data))) => {
                warn!(
                    "Dropping {} byte binary frame from connection {}",
                    data.len(),
                    conn_id
                );
            }
            Some(Ok(WsMessage::Close(_))) | None => break,
            // Ping/pong are answered by the transport.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket error on connection {}: {}", conn_id, e);
                break;
            }
        }
    }

    // Closed by someone else means the client stopped reading, so queued
    // frames are not worth flushing.
    let evicted = conn.state() == ConnectionState::Closed;
    state.registry.unregister(conn_id);
    info!("Client {} disconnected", conn_id);

    drop(conn);
    if evicted {
        writer.abort();
    } else {
        // Dropping the last sender lets the writer flush and exit.
        let _ = writer.await;
    }
}

/// Register `conn` and queue its hydration snapshot.
///
/// Runs under the sequencer so each accepted message is either in the
/// snapshot or broadcast to this connection afterwards, never both.
pub fn open(state: &AppState, conn: &ConnectionHandle) {
    let _order = state.sequencer.lock();
    if !conn.mark_open() {
        return;
    }
    state.registry.register(conn.clone());

    let messages = state.service.get_in_memory_history();
    let count = messages.len();
    conn.send(ServerFrame::History { messages }.to_json().into());
    info!(
        "Client {} connected, hydrated with {} messages ({} online)",
        conn.id(),
        count,
        state.registry.len()
    );
}

/// Parse, ingest and fan out one inbound text frame.
pub fn handle_text_frame(state: &AppState, conn: &ConnectionHandle, text: &str) -> FrameOutcome {
    if conn.state() != ConnectionState::Open {
        debug!("Ignoring frame on connection {} in state {:?}", conn.id(), conn.state());
        return FrameOutcome::Ignored;
    }

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Dropping malformed frame from connection {}: {}", conn.id(), e);
            return FrameOutcome::Malformed;
        }
    };
    let payload = InboundPayload::from_value(value);

    let accepted = {
        let _order = state.sequencer.lock();
        state.service.process_new_message(&payload).map(|message| {
            let id = message.id.clone();
            let frame = ServerFrame::Message { message }.to_json();
            (id, state.registry.broadcast(frame))
        })
    };

    match accepted {
        Ok((id, delivered)) => {
            info!(
                "Broadcasted message {} from connection {} to {} clients",
                id,
                conn.id(),
                delivered
            );
            FrameOutcome::Broadcast { id, delivered }
        }
        Err(rejection) => {
            warn!("Rejected message from connection {}: {}", conn.id(), rejection.code());
            let frame = ServerFrame::Error {
                error: ErrorBody {
                    code: rejection.code().to_string(),
                    message: rejection.to_string(),
                },
            };
            conn.send(frame.to_json().into());
            FrameOutcome::Rejected {
                code: rejection.code(),
            }
        }
    }
}
