//! Path access guard and security headers.
//!
//! The guard rejects internal files (settings, page sources, notification
//! data) with 403 before any static serving happens. Security headers are
//! added to every response the gateway produces.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::pages::status_page;

/// Blocked path prefixes.
pub const BLOCKED_PREFIXES: &[&str] = &["/api-page/"];

/// Blocked exact paths. The media root itself is not listable.
pub const BLOCKED_PATHS: &[&str] = &[
    "/src",
    "/src/",
    "/src/settings.json",
    "/api-page/notifications.json",
    "/api-page/styles.css",
    "/api-page/script.js",
];

/// Extensions served from the media directory.
pub const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "ico"];

/// Whether a path is never reachable.
pub fn is_blocked(path: &str) -> bool {
    BLOCKED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
        || BLOCKED_PATHS.contains(&path)
}

/// Whether a media file name has an image extension (case-insensitive).
pub fn is_servable_media(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| {
            MEDIA_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Reject blocked paths with 403.
pub async fn path_guard_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if is_blocked(path) {
        debug!(path = path, "Blocked access to internal path");
        return status_page(StatusCode::FORBIDDEN);
    }

    next.run(request).await
}

/// Add security headers to every response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}
