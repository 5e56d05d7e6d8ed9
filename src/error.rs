use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 内置字体资源损坏或缺失
    #[error("字体资源解析失败: {0}")]
    FontAsset(String),

    /// 字体 Face / 画布构造失败（字号、DPI 等参数非法）
    #[error("字体 Face 构造失败: {0}")]
    FontFace(String),

    /// PNG 编码失败
    #[error("PNG 编码失败: {0}")]
    Encode(String),

    /// 参数校验错误
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 禁止访问
    #[error("禁止访问: {0}")]
    Forbidden(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 所有 API 错误统一返回 `application/problem+json`，调用方可按 `code` 稳定处理。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Internal Server Error")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 500)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "CAPTCHA_RENDER_FAILED")]
    pub code: String,

    /// 请求追踪 ID（由 request-id 中间件注入）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // 渲染链路的三类失败对调用方而言都是“本次调用整体失败”
            AppError::FontAsset(_) | AppError::FontFace(_) | AppError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::FontAsset(_) => "FONT_ASSET_INVALID",
            AppError::FontFace(_) => "FONT_FACE_FAILED",
            AppError::Encode(_) => "PNG_ENCODE_FAILED",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.stable_code(), "请求失败: {}", self);
        }

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<ttf_parser::FaceParsingError> for AppError {
    fn from(err: ttf_parser::FaceParsingError) -> Self {
        AppError::FontAsset(err.to_string())
    }
}

impl From<png::EncodingError> for AppError {
    fn from(err: png::EncodingError) -> Self {
        AppError::Encode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("阻塞渲染任务执行失败: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn render_failures_are_server_errors() {
        for err in [
            AppError::FontAsset("bad magic".into()),
            AppError::FontFace("units_per_em = 0".into()),
            AppError::Encode("io".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn stable_codes_distinguish_render_failures() {
        assert_eq!(AppError::FontAsset(String::new()).stable_code(), "FONT_ASSET_INVALID");
        assert_eq!(AppError::FontFace(String::new()).stable_code(), "FONT_FACE_FAILED");
        assert_eq!(AppError::Encode(String::new()).stable_code(), "PNG_ENCODE_FAILED");
    }

    #[test]
    fn face_parsing_error_maps_to_font_asset() {
        let err: AppError = ttf_parser::FaceParsingError::UnknownMagic.into();
        assert!(matches!(err, AppError::FontAsset(_)));
    }
}
