//! Builtin routes, media serving and the path guard.

use axum::http::StatusCode;
use serde_json::json;

use super::test_utils::{
    assert_html_status, body_bytes, body_json, body_text, content_type, TestGatewayBuilder,
    BANNER_BYTES, INDEX_HTML, TEST_CREATOR,
};

// =============================================================================
// Front-end
// =============================================================================

#[tokio::test]
async fn test_index_page() {
    let gateway = TestGatewayBuilder::new().build();

    let response = gateway.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    assert_eq!(body_text(response).await, INDEX_HTML);
}

#[tokio::test]
async fn test_assets() {
    let gateway = TestGatewayBuilder::new().build();

    let response = gateway.get("/assets/styles.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "text/css");

    let response = gateway.get("/assets/script.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/javascript");
}

#[tokio::test]
async fn test_settings_document_is_raw() {
    let gateway = TestGatewayBuilder::new().build();

    let body = body_json(gateway.get("/api/settings").await).await;
    assert_eq!(
        body,
        json!({
            "maintenance": { "enabled": false },
            "apiSettings": { "creator": TEST_CREATOR, "name": "Test API" }
        })
    );
}

#[tokio::test]
async fn test_notifications_document_is_raw() {
    let gateway = TestGatewayBuilder::new().build();

    let body = body_json(gateway.get("/api/notifications").await).await;
    assert_eq!(body, json!([{ "id": 1, "title": "Welcome" }]));
}

// =============================================================================
// Media
// =============================================================================

#[tokio::test]
async fn test_preview_image_falls_back_to_banner() {
    let gateway = TestGatewayBuilder::new().build();

    let response = gateway.get("/api/preview-image").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "image/jpeg");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=86400"
    );
    assert_eq!(body_bytes(response).await, BANNER_BYTES);
}

#[tokio::test]
async fn test_media_images_are_served() {
    let gateway = TestGatewayBuilder::new().build();

    let response = gateway.get("/src/img/logo.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "image/png");
}

#[tokio::test]
async fn test_media_non_images_are_forbidden() {
    let gateway = TestGatewayBuilder::new().build();

    assert_html_status(&gateway.get("/src/notes.txt").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_media_is_404() {
    let gateway = TestGatewayBuilder::new().build();

    assert_html_status(&gateway.get("/src/nope.png").await, StatusCode::NOT_FOUND);
}

// =============================================================================
// Path Guard
// =============================================================================

#[tokio::test]
async fn test_internal_paths_are_forbidden() {
    let gateway = TestGatewayBuilder::new().build();

    for uri in [
        "/src/settings.json",
        "/api-page/index.html",
        "/api-page/notifications.json",
        "/api-page/styles.css",
        "/api-page/script.js",
        "/api-page/",
        "/src",
        "/src/",
    ] {
        let response = gateway.get(uri).await;
        assert_html_status(&response, StatusCode::FORBIDDEN);
        assert!(body_text(response).await.contains("403"), "{}", uri);
    }
}
