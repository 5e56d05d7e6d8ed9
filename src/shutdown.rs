//! 优雅退出：监听 SIGINT / SIGTERM（Windows 下为 Ctrl+C）。

use tracing::{error, info};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
}

/// 优雅退出错误类型
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("信号设置失败: {0}")]
    SignalSetup(String),
}

/// 等待退出信号
#[cfg(unix)]
pub async fn wait_for_signal() -> Result<ShutdownReason, ShutdownError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint =
        signal(SignalKind::interrupt()).map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;
    let mut sigterm =
        signal(SignalKind::terminate()).map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;

    let reason = tokio::select! {
        _ = sigint.recv() => ShutdownReason::Interrupt,
        _ = sigterm.recv() => ShutdownReason::Terminate,
    };
    info!("接收到退出信号: {:?}", reason);
    Ok(reason)
}

/// 等待退出信号
#[cfg(not(unix))]
pub async fn wait_for_signal() -> Result<ShutdownReason, ShutdownError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;
    info!("接收到Ctrl+C信号");
    Ok(ShutdownReason::Interrupt)
}

/// 供 `axum::serve(..).with_graceful_shutdown` 使用的退出 future。
///
/// 信号处理器注册失败时不会触发退出，只记录错误并一直挂起。
pub async fn shutdown_signal() {
    match wait_for_signal().await {
        Ok(reason) => info!("开始优雅关闭HTTP服务器 ({:?})...", reason),
        Err(e) => {
            error!("{}", e);
            std::future::pending::<()>().await;
        }
    }
}
