use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use captcha_render::{AppConfig, AppState, build_app};
use tower::ServiceExt;

fn build() -> Router {
    let config = AppConfig::default();
    let state = AppState::from_config(&config);
    build_app(&config, state)
}

fn header_value(resp: &axum::response::Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let resp = build()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");

    assert_eq!(resp.status(), StatusCode::OK);
    let request_id = header_value(&resp, "x-request-id");
    assert!(request_id.starts_with("cap_"), "got {request_id:?}");
}

#[tokio::test]
async fn request_id_uses_client_value_when_valid() {
    let resp = build()
        .oneshot(
            Request::builder()
                .uri("/api/v1/captcha?text=A")
                .header("x-request-id", "client.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /captcha");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_value(&resp, "x-request-id"), "client.req-001");
}

#[tokio::test]
async fn invalid_client_request_id_is_replaced() {
    let resp = build()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "bad id/with spaces")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /health");

    assert!(header_value(&resp, "x-request-id").starts_with("cap_"));
}

#[tokio::test]
async fn problem_details_contains_request_id() {
    let resp = build()
        .oneshot(
            Request::builder()
                .uri("/api/v1/captcha/challenge")
                .header("x-request-id", "err.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /captcha/challenge");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let request_id_header = header_value(&resp, "x-request-id");

    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("parse json");
    assert_eq!(json["requestId"].as_str(), Some(request_id_header.as_str()));
    assert_eq!(request_id_header, "err.req-001");
}
