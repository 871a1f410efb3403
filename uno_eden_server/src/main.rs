use anyhow::Context;
use tracing::info;

use uno_eden_server::config::ServerConfig;
use uno_eden_server::{telemetry, ws};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = ServerConfig::from_env()?;
    let addr = config.bind;
    let state = ws::AppState::new(config);
    let app = ws::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("服务器正在监听 {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务器异常退出")?;

    info!("服务器已关闭");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("无法监听 Ctrl-C 信号");
        std::future::pending::<()>().await;
    }
}
