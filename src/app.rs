use axum::{Router, routing::get};
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::features::{captcha, health};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // PNG 本身已压缩，只对 JSON（信封、错误、OpenAPI 文档）等文本响应启用压缩。
    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
}

/// 装配完整路由：`/health`、`/docs`，以及挂在 `config.api.prefix` 下的验证码接口。
pub fn build_app(config: &AppConfig, state: AppState) -> Router {
    let api_router = Router::<AppState>::new().merge(captcha::create_captcha_router());

    Router::<AppState>::new()
        .route("/health", get(health::health_check))
        .nest(&config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CompressionLayer::new().compress_when(compression_predicate()))
}
