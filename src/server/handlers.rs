//! Builtin HTTP handlers.
//!
//! These routes belong to the gateway itself rather than to an endpoint
//! plugin: the documentation front-end and its assets, the settings and
//! notification documents it renders, the preview image and media files.
//!
//! # Endpoints
//!
//! - `GET /` - Documentation page
//! - `GET /health` - Health check
//! - `GET /assets/styles.css`, `GET /assets/script.js` - Front-end assets
//! - `GET /api/settings` - Raw settings document
//! - `GET /api/notifications` - Raw notifications document
//! - `GET /api/preview-image` - Social preview image
//! - `GET /src/{*file}` - Image files from the media directory

use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::envelope::raw_json;
use super::guard::is_servable_media;
use crate::error::GatewayError;
use crate::settings::SettingsSource;

/// Paths owned by the gateway. Plugins may not register these.
pub const BUILTIN_PATHS: &[&str] = &[
    "/",
    "/health",
    "/assets/styles.css",
    "/assets/script.js",
    "/api/settings",
    "/api/notifications",
    "/api/preview-image",
    "/src/{*file}",
];

/// Candidates for the preview image, in order of preference.
pub const PREVIEW_IMAGES: &[&str] = &["preview.png", "banner.jpg", "icon.png"];

/// Cache lifetime of the preview image (1 day).
pub const PREVIEW_CACHE_CONTROL: &str = "public, max-age=86400";

// =============================================================================
// Application State
// =============================================================================

/// Shared state for the builtin handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live settings source
    pub settings: Arc<dyn SettingsSource>,

    /// Directory holding the documentation page, its assets and notifications
    pub page_dir: Arc<PathBuf>,

    /// Directory holding images (and the settings file, which is never served)
    pub media_dir: Arc<PathBuf>,
}

impl AppState {
    /// Create the builtin handler state.
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        page_dir: impl Into<PathBuf>,
        media_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            page_dir: Arc::new(page_dir.into()),
            media_dir: Arc::new(media_dir.into()),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// File Helpers
// =============================================================================

/// Content type for a file, from its extension.
pub fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Resolve a request-supplied relative path under `root`, refusing traversal.
fn resolve_under(root: &FsPath, relative: &str) -> Option<PathBuf> {
    let relative = FsPath::new(relative);
    let safe = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if safe && relative.components().next().is_some() {
        Some(root.join(relative))
    } else {
        None
    }
}

async fn read_file(path: &FsPath) -> Result<Vec<u8>, GatewayError> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GatewayError::NotFound(path.display().to_string())
        } else {
            GatewayError::Io(e)
        }
    })
}

async fn serve_file(path: &FsPath) -> Result<Response, GatewayError> {
    let data = read_file(path).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(path))], data).into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve the documentation page.
///
/// `GET /`
pub async fn index_handler(State(state): State<AppState>) -> Result<Response, GatewayError> {
    serve_file(&state.page_dir.join("index.html")).await
}

/// Serve the front-end stylesheet.
///
/// `GET /assets/styles.css`
pub async fn styles_handler(State(state): State<AppState>) -> Result<Response, GatewayError> {
    serve_file(&state.page_dir.join("styles.css")).await
}

/// Serve the front-end script.
///
/// `GET /assets/script.js`
pub async fn script_handler(State(state): State<AppState>) -> Result<Response, GatewayError> {
    serve_file(&state.page_dir.join("script.js")).await
}

/// Handle health check requests.
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Return the settings document as stored, without the envelope.
///
/// `GET /api/settings`
///
/// Exempt from the maintenance gate so the front-end can still render.
pub async fn settings_handler(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let settings = state.settings.current_settings().await?;
    Ok(raw_json(settings.raw))
}

/// Return the notifications document as stored, without the envelope.
///
/// `GET /api/notifications`
pub async fn notifications_handler(
    State(state): State<AppState>,
) -> Result<Response, GatewayError> {
    let path = state.page_dir.join("notifications.json");
    let data = tokio::fs::read(&path).await?;
    let notifications: Value = serde_json::from_slice(&data)?;
    Ok(raw_json(notifications))
}

/// Serve the first available preview image.
///
/// `GET /api/preview-image`
///
/// Tries `preview.png`, then `banner.jpg`, then `icon.png` from the media
/// directory. Responds 404 with a JSON error when none exists.
pub async fn preview_image_handler(State(state): State<AppState>) -> Response {
    for name in PREVIEW_IMAGES {
        let path = state.media_dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                return (
                    [
                        (header::CONTENT_TYPE, content_type_for(&path)),
                        (header::CACHE_CONTROL, PREVIEW_CACHE_CONTROL),
                    ],
                    data,
                )
                    .into_response();
            }
            Err(e) => debug!(path = %path.display(), "Preview candidate unavailable: {}", e),
        }
    }

    let mut response = raw_json(json!({ "error": "Preview image not found" }));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Serve image files from the media directory.
///
/// `GET /src/{*file}`
///
/// Anything that is not an image is forbidden, including the settings file
/// that lives next to the images.
pub async fn media_handler(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, GatewayError> {
    if !is_servable_media(&file) {
        return Err(GatewayError::Forbidden(format!("/src/{}", file)));
    }

    let path = resolve_under(&state.media_dir, &file)
        .ok_or_else(|| GatewayError::Forbidden(format!("/src/{}", file)))?;

    serve_file(&path).await
}

// =============================================================================
// Tests
// =============================================================================
