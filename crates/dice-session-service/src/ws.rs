// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! WebSocket edge: origin policy, per-viewer tasks and inbound decoding.

use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use axum::body::Bytes;
use axum::{
    extract::ws::{Message, WebSocket},
    extract::{ConnectInfo, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use dice_session_proto::{decode_client, ClientMessage};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::hub::{handle_action, SharedHub, OUTBOX_CAPACITY};

const PING_EVERY: Duration = Duration::from_secs(30);

pub struct AppState {
    pub hub: SharedHub,
    pub max_frame_bytes: usize,
    pub allow_origins: Option<HashSet<String>>,
    pub action_delay: Duration,
}

pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if !origin_allowed(state.allow_origins.as_ref(), &headers) {
        let origin = headers
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>");
        warn!(?addr, origin = %origin, "origin rejected");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, peer: SocketAddr) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    let (ctl_tx, mut ctl_rx) = mpsc::channel::<Message>(8);

    let registered = {
        let mut h = state.hub.lock().await;
        h.add_conn(frame_tx).map(|id| (id, h.conn_count()))
    };
    let conn_id = match registered {
        Ok((id, viewers)) => {
            info!(conn_id = id, ?peer, viewers, "viewer connected");
            id
        }
        Err(err) => {
            error!(?err, ?peer, "failed to register viewer");
            return;
        }
    };

    // Writer task: hub frames as text, plus pings/pongs. Ends when the hub
    // drops this viewer's outbox.
    let writer = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                frame = frame_rx.recv() => match frame {
                    Some(text) => Message::Text(text.into()),
                    None => {
                        debug!(conn_id, "outbox dropped by hub");
                        break;
                    }
                },
                Some(ctl) = ctl_rx.recv() => ctl,
            };
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let reader_state = state.clone();
    let pong_tx = ctl_tx.clone();
    let reader = tokio::spawn(async move {
        read_frames(&mut ws_rx, &reader_state, &pong_tx, conn_id).await;
    });

    let ping = tokio::spawn(async move {
        let mut interval = time::interval(PING_EVERY);
        // interval() ticks immediately; skip it so the first ping waits a period.
        interval.tick().await;
        loop {
            interval.tick().await;
            if ctl_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                break;
            }
        }
    });

    let mut reader = reader;
    let mut writer = writer;
    tokio::select! {
        res = &mut reader => log_task_result("reader", conn_id, res),
        res = &mut writer => log_task_result("writer", conn_id, res),
    }

    // Pending delayed actions from this viewer still apply; only its outbox goes.
    state.hub.lock().await.remove_conn(conn_id);
    ping.abort();
    reader.abort();
    writer.abort();
    log_task_result("ping", conn_id, ping.await);
    info!(conn_id, ?peer, "viewer disconnected");
}

/// Pumps inbound frames until the socket closes, errors, or the pong path
/// is gone.
async fn read_frames<S>(
    ws_rx: &mut S,
    state: &Arc<AppState>,
    pong_tx: &mpsc::Sender<Message>,
    conn_id: u64,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                dispatch(state, text.as_str(), conn_id);
            }
            Ok(Message::Ping(payload)) => {
                if pong_tx.send(Message::Pong(payload)).await.is_err() {
                    debug!(conn_id, "writer gone; stop reading");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => debug!(conn_id, "ignoring binary frame"),
            Err(err) => {
                warn!(?err, conn_id, "ws recv error");
                break;
            }
            Ok(Message::Pong(_)) => {}
        }
    }
}

/// Decodes one inbound text frame and schedules it; bad frames are dropped.
fn dispatch(state: &Arc<AppState>, text: &str, conn_id: u64) {
    let msg = match decode_client(text, state.max_frame_bytes) {
        Ok(ClientMessage::Unrecognized) => {
            debug!(conn_id, "ignoring unrecognized action");
            return;
        }
        Ok(msg) => msg,
        Err(err) => {
            debug!(conn_id, %err, "ignoring malformed frame");
            return;
        }
    };
    debug!(conn_id, kind = msg.kind(), "action scheduled");
    let hub = state.hub.clone();
    let delay = state.action_delay;
    tokio::spawn(async move {
        if let Err(err) = handle_action(hub, msg, delay).await {
            warn!(?err, conn_id, "action failed");
        }
    });
}

pub fn origin_allowed(allow: Option<&HashSet<String>>, headers: &HeaderMap) -> bool {
    let Some(allow) = allow else {
        return true;
    };
    headers
        .get("origin")
        .and_then(|origin| origin.to_str().ok())
        .is_some_and(|origin| allow.contains(origin))
}

fn log_task_result(name: &'static str, conn_id: u64, res: Result<(), JoinError>) {
    match res {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => {}
        Err(err) if err.is_panic() => error!(conn_id, ?err, "{name} task panicked"),
        Err(err) => warn!(conn_id, ?err, "{name} task failed"),
    }
}
