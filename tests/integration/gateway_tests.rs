//! End-to-end tests for the response envelope, status pages and headers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use super::test_utils::{
    assert_html_status, body_json, body_text, content_type, EchoModule, ExplodingHandlerModule,
    ListModule, StatusFalseModule, TestGatewayBuilder, TEST_CREATOR,
};

// =============================================================================
// Envelope
// =============================================================================

#[tokio::test]
async fn test_plugin_json_is_enveloped() {
    let gateway = TestGatewayBuilder::new().module(EchoModule).build();

    let response = gateway.get("/api/echo").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("application/json"));

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "status": true, "creator": TEST_CREATOR, "foo": 1 })
    );
}

#[tokio::test]
async fn test_handler_status_false_is_kept() {
    let gateway = TestGatewayBuilder::new().module(StatusFalseModule).build();

    let body = body_json(gateway.get("/api/refuse").await).await;
    assert_eq!(
        body,
        json!({ "status": false, "creator": TEST_CREATOR, "foo": 2 })
    );
}

#[tokio::test]
async fn test_arrays_are_not_enveloped() {
    let gateway = TestGatewayBuilder::new().module(ListModule).build();

    let body = body_json(gateway.get("/api/list").await).await;
    assert_eq!(body, json!([1, 2, 3]));
}

#[tokio::test]
async fn test_enveloped_json_is_pretty_printed() {
    let gateway = TestGatewayBuilder::new().module(EchoModule).build();

    let text = body_text(gateway.get("/api/echo").await).await;
    assert!(text.contains("\n  \"status\": true"));
}

#[tokio::test]
async fn test_health_is_enveloped() {
    let gateway = TestGatewayBuilder::new().build();

    let response = gateway.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["creator"], TEST_CREATOR);
    assert!(body["version"].is_string());
}

// =============================================================================
// Status Pages
// =============================================================================

#[tokio::test]
async fn test_unknown_path_gets_404_page() {
    let gateway = TestGatewayBuilder::new().build();

    let response = gateway.get("/definitely/not/here").await;
    assert_html_status(&response, StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("404"));
}

#[tokio::test]
async fn test_wrong_method_gets_405_page() {
    let gateway = TestGatewayBuilder::new().module(EchoModule).build();

    let response = gateway
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/echo")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_html_status(&response, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_handler_panic_gets_500_page() {
    let gateway = TestGatewayBuilder::new()
        .module(ExplodingHandlerModule)
        .module(EchoModule)
        .build();

    let response = gateway.get("/api/explode").await;
    assert_html_status(&response, StatusCode::INTERNAL_SERVER_ERROR);

    let text = body_text(response).await;
    assert!(!text.contains("handler exploded"));

    // The process keeps serving
    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);
}

// =============================================================================
// Headers
// =============================================================================

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let gateway = TestGatewayBuilder::new().module(EchoModule).build();

    for uri in ["/api/echo", "/missing", "/api-page/index.html", "/health"] {
        let response = gateway.get(uri).await;
        let headers = response.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff", "{}", uri);
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY", "{}", uri);
        assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block", "{}", uri);
        assert_eq!(
            headers.get("referrer-policy").unwrap(),
            "strict-origin-when-cross-origin",
            "{}",
            uri
        );
    }
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let gateway = TestGatewayBuilder::new().module(EchoModule).build();

    let response = gateway
        .send(
            Request::builder()
                .uri("/api/echo")
                .header("origin", "https://somewhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}
