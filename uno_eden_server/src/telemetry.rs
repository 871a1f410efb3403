use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// 初始化全局的 tracing 订阅者，日志级别可以用 RUST_LOG 覆盖，
/// 例如 `RUST_LOG=debug,axum=info`
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,axum=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
