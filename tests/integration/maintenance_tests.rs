//! Maintenance mode through the full middleware stack.

use std::io::Write;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use api_gateway::{FileSettings, GatewaySettings};

use super::test_utils::{
    assert_html_status, body_json, body_text, content_type, test_settings, BrokenSettings,
    EchoModule, TestGatewayBuilder, TEST_CREATOR,
};

fn maintenance_on() -> GatewaySettings {
    test_settings().with_maintenance(true)
}

#[tokio::test]
async fn test_api_paths_get_json_503() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .settings(maintenance_on())
        .build();

    let response = gateway.get("/api/echo").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(content_type(&response).starts_with("application/json"));

    let body = body_json(response).await;
    assert_eq!(body["status"], false);
    assert_eq!(body["maintenance"], true);
    assert_eq!(body["creator"], TEST_CREATOR);
    assert!(body["message"].as_str().unwrap().contains("maintenance"));
}

#[tokio::test]
async fn test_unknown_api_path_is_still_503() {
    let gateway = TestGatewayBuilder::new().settings(maintenance_on()).build();

    let response = gateway.get("/api/anything").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["maintenance"], true);

    let response = gateway.get("/ai/chat").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["maintenance"], true);
}

#[tokio::test]
async fn test_other_paths_get_maintenance_page() {
    let gateway = TestGatewayBuilder::new().settings(maintenance_on()).build();

    for uri in ["/", "/random/ba", "/nowhere"] {
        let response = gateway.get(uri).await;
        assert_html_status(&response, StatusCode::SERVICE_UNAVAILABLE);
        let text = body_text(response).await;
        assert!(text.contains("maintenance"), "{}", uri);
        assert!(text.contains(TEST_CREATOR), "{}", uri);
    }
}

#[tokio::test]
async fn test_exempt_paths_are_served() {
    let gateway = TestGatewayBuilder::new().settings(maintenance_on()).build();

    assert_eq!(gateway.get("/api/settings").await.status(), StatusCode::OK);
    assert_eq!(gateway.get("/assets/styles.css").await.status(), StatusCode::OK);
    assert_eq!(gateway.get("/assets/script.js").await.status(), StatusCode::OK);
    assert_eq!(gateway.get("/src/banner.jpg").await.status(), StatusCode::OK);
    assert_eq!(gateway.get("/api/preview-image").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_custom_exempt_paths_replace_defaults() {
    let settings = GatewaySettings::from_value(json!({
        "maintenance": { "enabled": true, "exemptPaths": ["/api/echo"] },
        "apiSettings": { "creator": TEST_CREATOR }
    }))
    .unwrap();

    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .settings(settings)
        .build();

    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);
    assert_eq!(
        gateway.get("/assets/styles.css").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_toggle_takes_effect_on_next_request() {
    let gateway = TestGatewayBuilder::new().module(EchoModule).build();

    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);

    gateway.settings.set_maintenance(true).await;
    assert_eq!(
        gateway.get("/api/echo").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    gateway.settings.set_maintenance(false).await;
    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unreadable_settings_fail_open() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .source(Arc::new(BrokenSettings))
        .build();

    let response = gateway.get("/api/echo").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["foo"], 1);
}

#[tokio::test]
async fn test_settings_file_is_reread_per_request() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"maintenance": {{"enabled": false}}, "apiSettings": {{"creator": "{}"}}}}"#,
        TEST_CREATOR
    )
    .unwrap();
    file.flush().unwrap();

    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .source(Arc::new(FileSettings::new(file.path())))
        .build();

    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);

    std::fs::write(
        file.path(),
        r#"{"maintenance": {"enabled": true}, "apiSettings": {"creator": "Night Shift"}}"#,
    )
    .unwrap();

    let response = gateway.get("/api/echo").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["creator"], "Night Shift");

    // A corrupt file lets traffic through again
    std::fs::write(file.path(), "{ not json").unwrap();
    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_maintenance_takes_precedence_over_guard() {
    let gateway = TestGatewayBuilder::new().settings(maintenance_on()).build();

    assert_eq!(
        gateway.get("/api-page/index.html").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
