//! WebSocket 事件推送
//!
//! 每条事件通知推送一条 `{"type":"log",...}`；客户端发送文本 `start` / `stop`
//! 直接映射到引擎的启停。落后的客户端收到 `{"type":"lagged","skipped":n}`。

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use scenario_engine::{EngineStatus, EventKind, EventNotice, Severity};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::state::AppState;

/// 推送给客户端的消息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Log {
        sequence: u64,
        event: EventKind,
        severity: Severity,
    },
    Lagged {
        skipped: u64,
    },
    Status {
        #[serde(flatten)]
        status: EngineStatus,
    },
}

impl From<EventNotice> for StreamMessage {
    fn from(notice: EventNotice) -> Self {
        Self::Log {
            sequence: notice.sequence,
            event: notice.event,
            severity: notice.severity,
        }
    }
}

pub fn stream_routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(stream_events))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_socket(socket, state))
}

async fn stream_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.engine.subscribe();
    let initial = StreamMessage::Status {
        status: state.engine.status(),
    };
    if send_stream_message(&mut socket, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !apply_command(&state, text.as_str()) {
                            continue;
                        }
                        let status = StreamMessage::Status { status: state.engine.status() };
                        if send_stream_message(&mut socket, &status).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                let message = match outgoing {
                    Ok(notice) => StreamMessage::from(notice),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => StreamMessage::Lagged { skipped },
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if send_stream_message(&mut socket, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("WebSocket 客户端断开");
}

/// 处理客户端文本指令，返回是否为已知指令
fn apply_command(state: &AppState, command: &str) -> bool {
    match command.trim() {
        "start" => {
            let started = state.engine.start();
            debug!(started, "WebSocket 指令: start");
            true
        }
        "stop" => {
            let stopped = state.engine.stop();
            debug!(stopped, "WebSocket 指令: stop");
            true
        }
        other => {
            debug!(command = other, "忽略未知的 WebSocket 指令");
            false
        }
    }
}

async fn send_stream_message(
    socket: &mut WebSocket,
    message: &StreamMessage,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}
