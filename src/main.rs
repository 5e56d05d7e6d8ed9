use captcha_render::{AppConfig, AppState, build_app, shutdown};

#[tokio::main]
async fn main() {
    // Load config（日志尚未初始化，加载失败时直接打印到 stderr）
    if let Err(e) = AppConfig::init_global() {
        eprintln!("Config init failed: {e}");
        std::process::exit(1);
    }
    let config = AppConfig::global();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.default_directives().into()),
        )
        .init();

    let state = AppState::from_config(config);
    tracing::info!(
        "验证码画布 {}x{}，字号 {}，DPI {}，缓存 {}",
        config.captcha.width,
        config.captcha.height,
        config.captcha.font_size,
        config.captcha.dpi,
        if config.captcha.cache_enabled { "开启" } else { "关闭" }
    );
    let app = build_app(config, state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Captcha API: http://{}{}/captcha?text=...", addr, config.api.prefix);

    let shutdown_timeout = config.shutdown.timeout_duration();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown::shutdown_signal().await;
        // 在途请求超过超时仍未完成时强制退出
        tokio::spawn(async move {
            tokio::time::sleep(shutdown_timeout).await;
            tracing::warn!("优雅退出超时（{:?}），强制退出", shutdown_timeout);
            std::process::exit(1);
        });
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
