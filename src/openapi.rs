use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 为 Swagger UI 提供正确的“业务接口前缀”Servers 配置。
///
/// - 业务接口默认前缀为 `/api/v1`（对应 `config.api.prefix` / `APP_API__PREFIX`）。
/// - `/health` 不带前缀，因此额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::captcha::handler::get_captcha,
        crate::features::captcha::handler::get_captcha_png,
        crate::features::captcha::handler::invoke,
        crate::features::captcha::handler::get_challenge,
    ),
    components(
        schemas(
            crate::error::AppError,
            crate::error::ProblemDetails,
            crate::features::captcha::ProxyRequest,
            crate::features::captcha::ProxyResponse,
            crate::features::captcha::ChallengeResponse,
            crate::features::captcha::CaptchaLayout,
        )
    ),
    modifiers(&ApiServers),
    tags(
        (
            name = "Captcha",
            description = "验证码图片：把文本渲染为 200x100 PNG，并以 base64 信封返回。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Captcha Render API",
        version = env!("CARGO_PKG_VERSION"),
        description = "验证码渲染服务 API（Axum + utoipa）。注意：除 /health 外，其余接口实际挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;
