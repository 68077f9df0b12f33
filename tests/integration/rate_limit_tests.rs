//! Rate limiting through the full middleware stack.

use std::time::Duration;

use axum::http::StatusCode;

use super::test_utils::{assert_html_status, body_text, EchoModule, TestGatewayBuilder};

#[tokio::test]
async fn test_sixteenth_request_is_rejected() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .rate_limit(Duration::from_secs(60), 15)
        .build();

    for i in 1..=15 {
        let response = gateway.get_from("/api/echo", "203.0.113.7").await;
        assert_eq!(response.status(), StatusCode::OK, "request {}", i);
    }

    let response = gateway.get_from("/api/echo", "203.0.113.7").await;
    assert_html_status(&response, StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    assert!(body_text(response).await.contains("429"));
}

#[tokio::test]
async fn test_clients_are_counted_separately() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .rate_limit(Duration::from_secs(60), 2)
        .build();

    assert_eq!(gateway.get_from("/api/echo", "198.51.100.1").await.status(), StatusCode::OK);
    assert_eq!(gateway.get_from("/api/echo", "198.51.100.1").await.status(), StatusCode::OK);
    assert_eq!(
        gateway.get_from("/api/echo", "198.51.100.1").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    assert_eq!(gateway.get_from("/api/echo", "198.51.100.2").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_leftmost_forwarded_address_is_the_client() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .rate_limit(Duration::from_secs(60), 1)
        .build();

    assert_eq!(
        gateway.get_from("/api/echo", "192.0.2.10, 10.0.0.1").await.status(),
        StatusCode::OK
    );
    assert_eq!(
        gateway.get_from("/api/echo", "192.0.2.10, 10.0.0.2").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    assert!(gateway.limiter.record("192.0.2.10").await.is_some());
}

#[tokio::test]
async fn test_forwarded_header_ignored_without_trust_proxy() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .rate_limit(Duration::from_secs(60), 1)
        .trust_proxy(false)
        .build();

    // Both requests collapse onto the same identity
    assert_eq!(gateway.get_from("/api/echo", "192.0.2.1").await.status(), StatusCode::OK);
    assert_eq!(
        gateway.get_from("/api/echo", "192.0.2.2").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_rejected_requests_do_not_reach_handlers() {
    let gateway = TestGatewayBuilder::new()
        .rate_limit(Duration::from_secs(60), 1)
        .build();

    assert_eq!(gateway.get_from("/missing", "192.0.2.50").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        gateway.get_from("/missing", "192.0.2.50").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_window_resets_after_expiry() {
    let gateway = TestGatewayBuilder::new()
        .module(EchoModule)
        .rate_limit(Duration::from_millis(200), 1)
        .build();

    assert_eq!(gateway.get_from("/api/echo", "192.0.2.77").await.status(), StatusCode::OK);
    assert_eq!(
        gateway.get_from("/api/echo", "192.0.2.77").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(gateway.get_from("/api/echo", "192.0.2.77").await.status(), StatusCode::OK);
    let record = gateway.limiter.record("192.0.2.77").await.unwrap();
    assert_eq!(record.count, 1);
}
