//! # UNO 核心逻辑库
//!
//! 这个 `core` crate 包含了 UNO 房间的全部状态管理、出牌规则、
//! 功能牌结算、UNO 喊牌/质疑，以及客户端-服务器通信消息的定义。
//! 它不依赖任何网络或锁，所有操作都是对单个 `Room` 的同步修改，
//! 由上层（服务器）负责并发控制和消息投递。

mod card;
mod error;
mod logic;
mod message;
mod state;

pub use card::*;

pub use error::GameError;

pub use logic::GameEvent;

pub use message::*;

pub use state::*;
