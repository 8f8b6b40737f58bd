//! WebSocket handler for the realtime order feed.
//!
//! DESIGN
//! ======
//! On upgrade the socket registers with the [`FeedHub`] and enters a
//! `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Feed frames pushed by the hub → forward to client
//!
//! Owners connect with a one-time ticket and choose tables with
//! `feed:subscribe`. Customers connect with `?order=<id>` and are pinned to
//! that order's updates; they cannot change their subscription.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register with hub → send `session:connected`
//! 2. Client sends frames → dispatch → replies go back to the sender only
//! 3. Hub pushes `change:*` / `notify:show` frames through the channel
//! 4. Close → unregister from hub

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame, Status};
use crate::services::feed::{ALL_KINDS, ChangeKind, FeedFilter, FeedTable};
use crate::services::order::{self, OrderError};
use crate::services::session;
use crate::state::AppState;

/// Outbound buffer per socket; the hub drops frames once it is full.
const CLIENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// PEER
// =============================================================================

/// Who is on the other end of the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peer {
    Owner(Uuid),
    /// Customer watching one order of a restaurant.
    Customer { owner_id: Uuid, order_id: Uuid },
}

impl Peer {
    fn owner_id(self) -> Uuid {
        match self {
            Self::Owner(id) | Self::Customer { owner_id: id, .. } => id,
        }
    }

    fn initial_filter(self) -> FeedFilter {
        match self {
            Self::Owner(_) => FeedFilter::owner(),
            Self::Customer { order_id, .. } => FeedFilter::order_watcher(order_id),
        }
    }

    fn role(self) -> &'static str {
        match self {
            Self::Owner(_) => "owner",
            Self::Customer { .. } => "customer",
        }
    }

    /// Value stamped into `from` on inbound frames.
    fn stamp(self) -> String {
        match self {
            Self::Owner(id) => id.to_string(),
            Self::Customer { .. } => "customer".into(),
        }
    }
}

/// Wire encoding of a connection. Protobuf binary is the default; a client
/// that speaks JSON text gets JSON text back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Binary,
    Text,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedSocketError {
    #[error("order watchers cannot change their subscription")]
    WatcherPinned,
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("table required")]
    MissingTable,
    #[error("connection no longer registered")]
    Gone,
}

impl ErrorCode for FeedSocketError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::WatcherPinned => "E_WATCHER_PINNED",
            Self::UnknownTable(_) => "E_UNKNOWN_TABLE",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::MissingTable => "E_MISSING_TABLE",
            Self::Gone => "E_SOCKET_GONE",
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    ticket: Option<String>,
    order: Option<Uuid>,
}

pub async fn handle_ws(State(state): State<AppState>, Query(params): Query<WsParams>, ws: WebSocketUpgrade) -> Response {
    let peer = match authenticate(&state, &params).await {
        Ok(peer) => peer,
        Err(response) => return response,
    };
    ws.on_upgrade(move |socket| run_ws(socket, state, peer))
}

async fn authenticate(state: &AppState, params: &WsParams) -> Result<Peer, Response> {
    if let Some(ticket) = params.ticket.as_deref() {
        return match session::consume_ws_ticket(&state.pool, ticket).await {
            Ok(Some(owner_id)) => Ok(Peer::Owner(owner_id)),
            Ok(None) => Err((StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response()),
            Err(e) => {
                tracing::error!(error = %e, "ws ticket validation failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "ticket validation error").into_response())
            }
        };
    }

    if let Some(order_id) = params.order {
        return match order::get_public(&state.pool, order_id).await {
            Ok(order) => Ok(Peer::Customer { owner_id: order.owner_id, order_id }),
            Err(OrderError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "order not found").into_response()),
            Err(e) => {
                tracing::error!(error = %e, %order_id, "ws order lookup failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "order lookup error").into_response())
            }
        };
    }

    Err((StatusCode::UNAUTHORIZED, "ticket or order required").into_response())
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, peer: Peer) {
    let client_id = Uuid::new_v4();
    let owner_id = peer.owner_id();
    let mut encoding = Encoding::Binary;

    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(CLIENT_CHANNEL_CAPACITY);
    state
        .feed
        .subscribe(owner_id, client_id, client_tx, peer.initial_filter())
        .await;

    let mut welcome = Frame::request(frames::syscall::SESSION_CONNECTED, Data::new())
        .with_owner_id(owner_id)
        .with_from("system")
        .with_data("client_id", client_id.to_string())
        .with_data("role", peer.role());
    if let Peer::Customer { order_id, .. } = peer {
        welcome = welcome.with_data("order_id", order_id.to_string());
    }

    if send_frame(&mut socket, encoding, &welcome).await.is_ok() {
        info!(%client_id, %owner_id, role = peer.role(), "ws: client connected");

        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(Ok(msg)) = msg else { break };
                    let replies = match msg {
                        Message::Binary(bytes) => {
                            encoding = Encoding::Binary;
                            process_inbound_binary(&state, peer, client_id, &bytes).await
                        }
                        Message::Text(text) => {
                            encoding = Encoding::Text;
                            process_inbound_text(&state, peer, client_id, text.as_str()).await
                        }
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    for frame in replies {
                        let _ = send_frame(&mut socket, encoding, &frame).await;
                    }
                }
                Some(frame) = client_rx.recv() => {
                    if send_frame(&mut socket, encoding, &frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    state.feed.unsubscribe(owner_id, client_id).await;
    let remaining = state.feed.total_subscribers().await;
    info!(%client_id, %owner_id, remaining, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one protobuf frame and process it. Returns frames for the sender.
async fn process_inbound_binary(state: &AppState, peer: Peer, client_id: Uuid, bytes: &[u8]) -> Vec<Frame> {
    let decoded = frames::decode_frame(bytes)
        .map_err(|e| e.to_string())
        .and_then(|wire| Frame::try_from(wire).map_err(|e| e.to_string()));
    match decoded {
        Ok(req) => process_inbound(state, peer, client_id, req).await,
        Err(e) => vec![gateway_error(client_id, &format!("invalid frame: {e}"))],
    }
}

/// Parse one JSON text frame and process it.
async fn process_inbound_text(state: &AppState, peer: Peer, client_id: Uuid, text: &str) -> Vec<Frame> {
    let decoded = serde_json::from_str::<frames::Frame>(text)
        .map_err(|e| e.to_string())
        .and_then(|wire| Frame::try_from(wire).map_err(|e| e.to_string()));
    match decoded {
        Ok(req) => process_inbound(state, peer, client_id, req).await,
        Err(e) => vec![gateway_error(client_id, &format!("invalid json: {e}"))],
    }
}

fn gateway_error(client_id: Uuid, message: &str) -> Frame {
    warn!(%client_id, error = message, "ws: invalid inbound frame");
    Frame::request(frames::syscall::GATEWAY_ERROR, Data::new()).with_data("message", message)
}

/// Dispatch one decoded client frame.
async fn process_inbound(state: &AppState, peer: Peer, client_id: Uuid, mut req: Frame) -> Vec<Frame> {
    req.from = Some(peer.stamp());
    debug!(%client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let reply = match req.prefix() {
        "feed" => handle_feed(state, peer, client_id, &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };
    vec![reply.unwrap_or_else(|err_frame| err_frame)]
}

// =============================================================================
// FEED HANDLERS
// =============================================================================

async fn handle_feed(state: &AppState, peer: Peer, client_id: Uuid, req: &Frame) -> Result<Frame, Frame> {
    match req.op() {
        "ping" => Ok(req.done_with(Data::from([("pong".to_owned(), serde_json::json!(true))]))),
        "subscribe" => {
            if matches!(peer, Peer::Customer { .. }) {
                return Err(req.error_from(&FeedSocketError::WatcherPinned));
            }
            let table = requested_table(req).map_err(|e| req.error_from(&e))?;
            let kinds = requested_kinds(req).map_err(|e| req.error_from(&e))?;

            let updated = state
                .feed
                .update_filter(peer.owner_id(), client_id, |filter| filter.subscribe(table, &kinds))
                .await;
            if !updated {
                return Err(req.error_from(&FeedSocketError::Gone));
            }

            let events: Vec<&str> = kinds.iter().map(|k| k.event()).collect();
            info!(%client_id, table = table.as_str(), ?events, "ws: feed subscribed");
            let mut data = Data::new();
            data.insert("table".into(), serde_json::json!(table.as_str()));
            data.insert("events".into(), serde_json::json!(events));
            Ok(req.done_with(data))
        }
        "unsubscribe" => {
            if matches!(peer, Peer::Customer { .. }) {
                return Err(req.error_from(&FeedSocketError::WatcherPinned));
            }
            let table = requested_table(req).map_err(|e| req.error_from(&e))?;
            let updated = state
                .feed
                .update_filter(peer.owner_id(), client_id, |filter| filter.unsubscribe(table))
                .await;
            if !updated {
                return Err(req.error_from(&FeedSocketError::Gone));
            }
            Ok(req.done())
        }
        op => Err(req.error(format!("unknown feed op: {op}"))),
    }
}

fn requested_table(req: &Frame) -> Result<FeedTable, FeedSocketError> {
    let raw = req
        .data
        .get("table")
        .and_then(|v| v.as_str())
        .ok_or(FeedSocketError::MissingTable)?;
    FeedTable::parse(raw).ok_or_else(|| FeedSocketError::UnknownTable(raw.to_owned()))
}

/// Event kinds from `data.events`. Missing, empty, or `"*"` means all.
fn requested_kinds(req: &Frame) -> Result<Vec<ChangeKind>, FeedSocketError> {
    let Some(events) = req.data.get("events").and_then(|v| v.as_array()) else {
        return Ok(ALL_KINDS.to_vec());
    };
    let raw: Vec<&str> = events.iter().filter_map(|v| v.as_str()).collect();
    if raw.is_empty() || raw.contains(&"*") {
        return Ok(ALL_KINDS.to_vec());
    }
    raw.into_iter()
        .map(|e| ChangeKind::parse(e).ok_or_else(|| FeedSocketError::UnknownEvent(e.to_owned())))
        .collect()
}

// =============================================================================
// HELPERS
// =============================================================================

fn encode(frame: &Frame, encoding: Encoding) -> Result<Message, serde_json::Error> {
    let wire = frames::Frame::from(frame);
    match encoding {
        Encoding::Binary => Ok(Message::Binary(frames::encode_frame(&wire).into())),
        Encoding::Text => Ok(Message::Text(serde_json::to_string(&wire)?.into())),
    }
}

async fn send_frame(socket: &mut WebSocket, encoding: Encoding, frame: &Frame) -> Result<(), ()> {
    let message = match encode(frame, encoding) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame
            .data
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let message = frame
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        debug!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(message).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
