//! UNO 房间服务器：房间注册表、会话网关和 WebSocket 传输层。

pub mod config;
pub mod gateway;
pub mod identity;
pub mod registry;
pub mod telemetry;
pub mod ws;
