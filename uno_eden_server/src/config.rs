//! 服务器配置，全部来自环境变量
//!
//! - `UNO_BIND`：监听地址，例如 `127.0.0.1:25917`
//! - `PORT`：只给端口时监听 0.0.0.0（`UNO_BIND` 优先）
//! - `UNO_CHANNEL_CAPACITY`：每个连接的发送队列长度

use std::env;
use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 25917;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    // 每个连接的 mpsc 队列容量
    pub channel_capacity: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("环境变量 {var} 无效: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 用任意的键值来源构造配置，测试时不需要改进程环境变量
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();

        if let Some(bind) = lookup("UNO_BIND") {
            config.bind = bind.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "UNO_BIND",
                reason: format!("{}", e),
            })?;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{}", e),
            })?;
            config.bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        }

        if let Some(capacity) = lookup("UNO_CHANNEL_CAPACITY") {
            config.channel_capacity = capacity.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "UNO_CHANNEL_CAPACITY",
                reason: format!("{}", e),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "UNO_CHANNEL_CAPACITY",
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}
