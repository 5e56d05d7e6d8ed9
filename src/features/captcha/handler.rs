use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use super::challenge::{captcha_url, generate_cipher};
use super::layout::CaptchaLayout;
use super::renderer::render_captcha_png;
use super::types::{CaptchaQuery, ChallengeResponse, ProxyRequest, ProxyResponse};
use crate::{error::AppError, state::AppState};

/// 网关调用入口：读取 `text` 查询参数，渲染并返回 base64 信封。
///
/// 同步、无状态，不经过缓存，供嵌入到其他运行时时直接调用；
/// HTTP 路由走 [`CaptchaService::handle_proxy_request`](super::CaptchaService::handle_proxy_request)，
/// 两者产出的信封字节一致。
pub fn handle_proxy_request(
    req: &ProxyRequest,
    layout: &CaptchaLayout,
) -> Result<ProxyResponse, AppError> {
    let png = render_captcha_png(req.text(), layout)?;
    Ok(ProxyResponse::png(&png))
}

#[utoipa::path(
    get,
    path = "/captcha",
    summary = "生成验证码图片（base64）",
    description = "将 text 渲染到 200x100 白底画布上，返回 base64 编码的 PNG。Content-Type 为 image/png，并通过 X-Is-Base64-Encoded 头标记 body 已 base64 编码。",
    params(CaptchaQuery),
    responses(
        (status = 200, description = "base64 编码的 PNG", content_type = "image/png", body = String),
        (status = 500, description = "渲染失败", body = AppError)
    ),
    tag = "Captcha"
)]
pub async fn get_captcha(
    State(state): State<AppState>,
    Query(q): Query<CaptchaQuery>,
) -> Result<ProxyResponse, AppError> {
    state.captcha.render_envelope(&q.text).await
}

#[utoipa::path(
    get,
    path = "/captcha.png",
    summary = "生成验证码图片（原始 PNG）",
    description = "与 /captcha 相同的渲染结果，直接返回 PNG 字节（即网关解码 base64 后转发给客户端的内容）。",
    params(CaptchaQuery),
    responses(
        (status = 200, description = "PNG bytes", content_type = "image/png"),
        (status = 500, description = "渲染失败", body = AppError)
    ),
    tag = "Captcha"
)]
pub async fn get_captcha_png(
    State(state): State<AppState>,
    Query(q): Query<CaptchaQuery>,
) -> Result<impl IntoResponse, AppError> {
    let png: Bytes = state.captcha.render_png(&q.text).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        png,
    ))
}

#[utoipa::path(
    post,
    path = "/invoke",
    summary = "网关事件调用",
    description = "接收无服务器网关风格的事件（queryStringParameters.text），返回响应信封 JSON：statusCode / headers / body(base64) / isBase64Encoded。",
    request_body = ProxyRequest,
    responses(
        (status = 200, description = "响应信封", body = ProxyResponse),
        (status = 422, description = "事件格式错误", body = AppError),
        (status = 500, description = "渲染失败", body = AppError)
    ),
    tag = "Captcha"
)]
pub async fn invoke(
    State(state): State<AppState>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let envelope = state.captcha.handle_proxy_request(&req).await?;
    Ok(Json(envelope))
}

#[utoipa::path(
    get,
    path = "/captcha/challenge",
    summary = "下发验证码口令",
    description = "生成随机大写字母口令，并返回渲染该口令的图片地址。口令明文返回，仅供受信任的后端调用；需在配置中开启 captcha.challenge_enabled。",
    responses(
        (status = 200, description = "口令与图片地址", body = ChallengeResponse),
        (status = 403, description = "未开启", body = AppError)
    ),
    tag = "Captcha"
)]
pub async fn get_challenge(
    State(state): State<AppState>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let settings = &state.challenge;
    if !settings.enabled {
        return Err(AppError::Forbidden("口令下发未开启".to_string()));
    }
    let cipher = generate_cipher(settings.length);
    let url = captcha_url(&settings.endpoint, &cipher);
    tracing::info!("下发验证码口令，长度 {}", cipher.len());
    Ok(Json(ChallengeResponse { cipher, url }))
}

pub fn create_captcha_router() -> Router<AppState> {
    Router::new()
        .route("/captcha", get(get_captcha))
        .route("/captcha.png", get(get_captcha_png))
        .route("/captcha/challenge", get(get_challenge))
        .route("/invoke", post(invoke))
}
