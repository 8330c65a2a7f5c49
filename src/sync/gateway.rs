//! WebSocket gateway: handshake, per-connection read loop, ack delivery,
//! and room fanout.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedSender};

use super::events::{Ack, InboundFrame};
use super::handlers;
use crate::auth::{self, AuthIdentity};
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::sync::rooms::ConnectionId;

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

pub async fn sync_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SyncQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(state, query.api_key, socket))
}

fn authenticate(state: &AppState, api_key: Option<&str>) -> Result<AuthIdentity> {
    let raw = api_key.ok_or(Error::Unauthorized)?;
    auth::resolve_tenant_key(state, raw)
}

async fn handle_connection(state: Arc<AppState>, api_key: Option<String>, socket: WebSocket) {
    let identity = match authenticate(&state, api_key.as_deref()) {
        Ok(identity) => identity,
        Err(error) => {
            tracing::warn!("channel handshake rejected: {error}");
            close_with_code(socket, error.code()).await;
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = state.rooms.join(&identity.tenant_id, tx.clone());
    tracing::info!(tenant = %identity.tenant_id, conn = conn_id, "peer connected");

    // Writer task drains acks and broadcasts; room fanout never blocks on a
    // slow peer.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // One sequential read loop per connection preserves per-connection event
    // ordering up to the ack.
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(_) => break,
        };
        match message {
            Message::Text(text) => handle_frame(&state, &identity, conn_id, &tx, text.as_str()),
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Leave before the next broadcast enumeration; pending acks in the
    // writer queue are dropped with it.
    state.rooms.leave(&identity.tenant_id, conn_id);
    writer.abort();
    tracing::info!(tenant = %identity.tenant_id, conn = conn_id, "peer disconnected");
}

fn handle_frame(
    state: &AppState,
    identity: &AuthIdentity,
    conn_id: ConnectionId,
    tx: &UnboundedSender<String>,
    text: &str,
) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            let id = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|value| value.get("id")?.as_u64())
                .unwrap_or(0);
            let ack = Ack::err(&Error::Validation(format!("malformed frame: {e}")));
            let _ = tx.send(ack.to_frame(id));
            return;
        }
    };

    let outcome = handlers::dispatch(state, identity, &frame);

    // Ack the caller first, then fan out with sender exclusion. Both happen
    // after the mutation committed, so room delivery follows commit order.
    let _ = tx.send(outcome.ack.to_frame(frame.id));
    if let Some(event) = outcome.broadcast {
        state
            .rooms
            .broadcast(&identity.tenant_id, &event.to_frame(), Some(conn_id));
    }
}

async fn close_with_code(mut socket: WebSocket, code: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: code.to_string().into(),
        })))
        .await;
}
