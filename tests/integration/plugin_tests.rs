//! Plugin registration through `build_gateway`.

use axum::http::StatusCode;

use api_gateway::{manifest, PluginError};

use super::test_utils::{
    assert_html_status, body_json, body_text, content_type, EchoModule, FailingModule,
    HijackModule, PanickingModule, PathModule, StrictQueryModule, TestGatewayBuilder,
};

#[tokio::test]
async fn test_one_valid_one_malformed_counts_one() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .module(FailingModule)
        .build();

    assert_eq!(gateway.report.loaded, 1);
    assert_eq!(gateway.report.failures.len(), 1);
    assert_eq!(gateway.report.failures[0].module, "test/failing");

    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);
    // Routes added before the failure are discarded
    assert_eq!(
        gateway.get("/api/half-registered").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_panicking_registrar_does_not_stop_loading() {
    let gateway = TestGatewayBuilder::new()
        .module(PanickingModule)
        .module(EchoModule)
        .build();

    assert_eq!(gateway.report.loaded, 1);
    assert!(matches!(
        gateway.report.failures[0].error,
        PluginError::Panicked(_)
    ));
    assert_eq!(gateway.get("/api/echo").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_builtin_paths_cannot_be_claimed() {
    let gateway = TestGatewayBuilder::new().module(HijackModule).build();

    assert_eq!(gateway.report.loaded, 0);
    assert!(matches!(
        gateway.report.failures[0].error,
        PluginError::DuplicateRoute { .. }
    ));

    let text = body_text(gateway.get("/health").await).await;
    assert!(text.contains("healthy"));
}

#[tokio::test]
async fn test_first_module_keeps_a_contested_path() {
    let gateway = TestGatewayBuilder::new()
        .module(PathModule {
            identity: "test/first",
            path: "/tools/same",
        })
        .module(PathModule {
            identity: "test/second",
            path: "/tools/same",
        })
        .build();

    assert_eq!(gateway.report.loaded, 1);
    assert_eq!(gateway.report.failures[0].module, "test/second");
    assert_eq!(body_text(gateway.get("/tools/same").await).await, "test/first");
}

#[tokio::test]
async fn test_relative_path_is_rejected() {
    let gateway = TestGatewayBuilder::new()
        .module(PathModule {
            identity: "test/relative",
            path: "tools/relative",
        })
        .build();

    assert_eq!(gateway.report.loaded, 0);
    assert!(matches!(
        gateway.report.failures[0].error,
        PluginError::InvalidPath { .. }
    ));
}

#[tokio::test]
async fn test_route_report_lists_paths() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .module(PathModule {
            identity: "test/other",
            path: "/tools/other",
        })
        .build();

    let paths: Vec<_> = gateway
        .report
        .routes
        .iter()
        .map(|route| (route.module.as_str(), route.path.as_str()))
        .collect();
    assert_eq!(
        paths,
        vec![("test/echo", "/api/echo"), ("test/other", "/tools/other")]
    );
}

#[tokio::test]
async fn test_bundled_manifest_registers_cleanly() {
    let gateway = TestGatewayBuilder::new();
    let gateway = manifest()
        .into_iter()
        .fold(gateway, |builder, module| builder.boxed_module(module))
        .build();

    assert_eq!(gateway.report.loaded, 3);
    assert!(gateway.report.failures.is_empty());

    let paths: Vec<_> = gateway
        .report
        .routes
        .iter()
        .map(|route| route.path.as_str())
        .collect();
    assert!(paths.contains(&"/random/ba"));
    assert!(paths.contains(&"/tools/remini"));
    assert!(paths.contains(&"/image/search/sticker"));
}

#[tokio::test]
async fn test_bundled_plugins_validate_parameters() {
    let gateway = manifest()
        .into_iter()
        .fold(TestGatewayBuilder::new(), |builder, module| {
            builder.boxed_module(module)
        })
        .build();

    let response = gateway.get("/tools/remini").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value =
        serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], false);
    assert!(body["creator"].is_string());

    let response = gateway.get("/image/search/sticker").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = gateway
        .get("/tools/remini?url=https://example.com/a.png&res=99k")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undecodable_query_gets_plugin_failure() {
    let gateway = manifest()
        .into_iter()
        .fold(TestGatewayBuilder::new(), |builder, module| {
            builder.boxed_module(module)
        })
        .build();

    for uri in [
        "/image/search/sticker?q=a&q=b",
        "/tools/remini?url=https://example.com/a.png&url=https://example.com/b.png",
    ] {
        let response = gateway.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert!(content_type(&response).starts_with("application/json"));

        let body = body_json(response).await;
        assert_eq!(body["status"], false);
        assert_eq!(body["message"], "Invalid query parameters");
        assert!(!body.to_string().contains("duplicate field"), "{}", uri);
    }
}

#[tokio::test]
async fn test_extractor_rejection_renders_status_page() {
    let gateway = TestGatewayBuilder::new().module(StrictQueryModule).build();

    let response = gateway.get("/api/count?count=7").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 7);

    for uri in ["/api/count", "/api/count?count=many", "/api/count?count=1&count=2"] {
        let response = gateway.get(uri).await;
        assert_html_status(&response, StatusCode::BAD_REQUEST);
        let text = body_text(response).await;
        assert!(text.contains("400"), "{}", uri);
        assert!(!text.contains("deserialize"), "{}", uri);
        assert!(!text.contains("count"), "{}", uri);
    }
}
