use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use uno_eden_core::{ClientMessage, Outbound, PlayerId, Recipient, RoomSummary, ServerMessage};

use crate::config::ServerConfig;
use crate::gateway::Gateway;

// 服务器全局状态
pub struct AppState {
    pub gateway: Gateway,
    // 将连接标识映射到该连接的发送通道
    pub connections: DashMap<PlayerId, mpsc::Sender<ServerMessage>>,
    pub config: ServerConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ServerConfig) -> SharedState {
        Arc::new(AppState {
            gateway: Gateway::new(Default::default()),
            connections: DashMap::new(),
            config,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    // 显示名称，没有名称的连接不能做任何房间操作
    name: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/healthz", get(healthz))
        .route("/rooms", get(list_rooms))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomSummary>> {
    Json(state.gateway.registry.list_available_rooms())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let name = params.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    ws.on_upgrade(move |socket| handle_socket(socket, state, name))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState, name: Option<String>) {
    let conn = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，其他连接的操作通过它给本连接发消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.channel_capacity);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    // 名字被占用时不登录，连接保留但不能做房间操作
    let name = match name {
        Some(name) => state.gateway.directory.register(conn, name.clone()).map(|()| Some(name)),
        None => Ok(None),
    };
    state.connections.insert(conn, tx.clone());

    let welcome_name = name.as_ref().ok().cloned().flatten();
    info!("新连接 {} ({})", conn, welcome_name.as_deref().unwrap_or("未登录"));
    let mut greeting = vec![Outbound::to_player(conn, ServerMessage::Welcome {
        your_id: conn,
        name: welcome_name.unwrap_or_default(),
    })];
    if let Err(e) = name {
        greeting.push(Outbound::to_player(conn, ServerMessage::error(e)));
    }
    deliver(&state, greeting);

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    let out = state.gateway.dispatch(conn, client_msg);
                    deliver(&state, out);
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // 客户端断开连接，执行清理工作
    state.connections.remove(&conn);
    let out = state.gateway.disconnect(&conn);
    deliver(&state, out);
    state.gateway.directory.unregister(&conn);
    drop(tx);
    send_task.abort();
    info!("客户端连接 {} 关闭", conn);
}

/// 把网关产生的消息投递到各个连接。
/// 只用 `try_send`，从不等待：某个连接的队列满了就丢弃发给它的这条消息，
/// 不会拖住其他连接的处理循环。
pub fn deliver(state: &AppState, out: Vec<Outbound>) {
    for Outbound { to, message } in out {
        match to {
            Recipient::Player(id) => {
                if let Some(tx) = state.connections.get(&id) {
                    push(&id, tx.value(), message);
                }
            }
            Recipient::Everyone => {
                for entry in state.connections.iter() {
                    push(entry.key(), entry.value(), message.clone());
                }
            }
        }
    }
}

fn push(id: &PlayerId, tx: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    match tx.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("连接 {} 的发送队列已满，丢弃消息", id),
        Err(TrySendError::Closed(_)) => debug!("连接 {} 已关闭，丢弃消息", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stalled_connection_does_not_block_others() {
        let state = AppState::new(ServerConfig::default());
        let stalled = Uuid::new_v4();
        let active = Uuid::new_v4();
        let (stalled_tx, _stalled_rx) = mpsc::channel(1);
        let (active_tx, mut active_rx) = mpsc::channel(64);
        state.connections.insert(stalled, stalled_tx);
        state.connections.insert(active, active_tx);

        let out: Vec<Outbound> = (0..33).map(|_| Outbound::to_everyone(ServerMessage::RoomsUpdated)).collect();
        deliver(&state, out);
        deliver(&state, vec![Outbound::to_player(active, ServerMessage::RoomLeft { room_code: "1234".to_string() })]);

        let mut received = 0;
        while let Ok(msg) = active_rx.try_recv() {
            received += 1;
            if received == 34 {
                assert_eq!(msg, ServerMessage::RoomLeft { room_code: "1234".to_string() });
            }
        }
        assert_eq!(received, 34);
    }

    #[test]
    fn test_closed_connection_is_skipped() {
        let state = AppState::new(ServerConfig::default());
        let gone = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        state.connections.insert(gone, tx);

        deliver(&state, vec![Outbound::to_player(gone, ServerMessage::RoomsUpdated)]);
        deliver(&state, vec![Outbound::to_player(Uuid::new_v4(), ServerMessage::RoomsUpdated)]);
    }
}
