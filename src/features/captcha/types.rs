use std::collections::{BTreeMap, HashMap};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// 直接 HTTP 响应里用于携带 `isBase64Encoded` 标志的响应头
pub const BASE64_FLAG_HEADER: &str = "x-is-base64-encoded";

/// `GET /captcha` 的查询参数
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CaptchaQuery {
    /// 要渲染的文本（缺省为空串，渲染为空白画布）
    #[serde(default)]
    pub text: String,
}

/// 无服务器网关风格的调用事件（仅使用查询参数）
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// 查询参数（网关在无参数时会传 null）
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// 请求头（未使用，保留以便完整反序列化网关事件）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl ProxyRequest {
    /// 以 `text` 查询参数构造事件
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            query_string_parameters: Some(HashMap::from([("text".to_string(), text.into())])),
            headers: None,
        }
    }

    /// `text` 参数，缺省为空串
    pub fn text(&self) -> &str {
        self.query_string_parameters
            .as_ref()
            .and_then(|q| q.get("text"))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// 无服务器网关风格的响应信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    #[schema(example = 200)]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// base64 编码后的 PNG
    pub body: String,
    #[schema(example = true)]
    pub is_base64_encoded: bool,
}

impl ProxyResponse {
    /// 200 + `image/png` + base64 body
    pub fn png(bytes: &[u8]) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            headers: BTreeMap::from([("Content-Type".to_string(), "image/png".to_string())]),
            body: STANDARD.encode(bytes),
            is_base64_encoded: true,
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::from(self.body));
        *res.status_mut() =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = res.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => {
                    headers.insert(n, v);
                }
                _ => tracing::warn!("忽略非法响应头: {}: {}", name, value),
            }
        }
        if self.is_base64_encoded {
            headers.insert(BASE64_FLAG_HEADER, HeaderValue::from_static("true"));
        }
        res
    }
}

/// 口令下发响应
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// 期望用户输入的口令
    #[schema(example = "QZKD")]
    pub cipher: String,
    /// 渲染该口令的图片地址
    #[schema(example = "/api/v1/captcha.png?text=QZKD")]
    pub url: String,
}
