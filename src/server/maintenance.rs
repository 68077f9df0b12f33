//! Maintenance gate.
//!
//! The gate re-reads the settings on every request. While maintenance is
//! enabled, every path outside the exempt prefixes is answered with 503:
//! API namespaces (`/api/*`, `/ai/*`) get a JSON body carrying
//! `"maintenance": true`, everything else gets the maintenance page.
//!
//! If the settings cannot be read the gate fails open and the request
//! proceeds. A broken settings file must never take the whole gateway down.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::pages::render_maintenance_page;
use crate::settings::{GatewaySettings, SettingsSource};

/// Path prefixes answered with JSON instead of HTML.
pub const API_NAMESPACES: &[&str] = &["/api/", "/ai/"];

/// Whether a path belongs to an API namespace.
pub fn is_api_path(path: &str) -> bool {
    API_NAMESPACES.iter().any(|prefix| path.starts_with(prefix))
}

/// Whether the given settings close the gate for `path`.
pub fn should_block(settings: &GatewaySettings, path: &str) -> bool {
    settings.maintenance_enabled && !settings.is_exempt(path)
}

/// JSON body returned to API clients during maintenance.
#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    /// Always false
    pub status: bool,

    /// Short error label
    pub error: String,

    /// Human-readable explanation
    pub message: String,

    /// Always true, so clients can tell maintenance from other failures
    pub maintenance: bool,

    /// Configured attribution
    pub creator: String,
}

impl MaintenanceResponse {
    /// Create the maintenance body for the given attribution.
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            status: false,
            error: "Service temporarily unavailable".to_string(),
            message: "The API is currently under maintenance. Please try again later.".to_string(),
            maintenance: true,
            creator: creator.into(),
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through
    Proceed,

    /// Answer with the maintenance response
    Block {
        /// Attribution from the settings that closed the gate
        attribution: String,
    },
}

/// Gate consulting a settings source on every request.
#[derive(Clone)]
pub struct MaintenanceGate {
    source: Arc<dyn SettingsSource>,
}

impl MaintenanceGate {
    /// Create a gate reading from `source`.
    pub fn new(source: Arc<dyn SettingsSource>) -> Self {
        Self { source }
    }

    /// Decide whether a request for `path` must be blocked.
    pub async fn check(&self, path: &str) -> GateDecision {
        match self.source.current_settings().await {
            Ok(settings) if should_block(&settings, path) => GateDecision::Block {
                attribution: settings.attribution_name,
            },
            Ok(_) => GateDecision::Proceed,
            Err(e) => {
                warn!(
                    source = %self.source.identifier(),
                    "Error checking maintenance mode, letting request through: {}",
                    e
                );
                GateDecision::Proceed
            }
        }
    }
}

/// Build the 503 response for a blocked path.
pub fn maintenance_response(path: &str, attribution: &str) -> Response {
    if is_api_path(path) {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(MaintenanceResponse::new(attribution)),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(render_maintenance_page(attribution)),
        )
            .into_response()
    }
}

/// Axum middleware applying the maintenance gate.
pub async fn maintenance_middleware(
    State(gate): State<MaintenanceGate>,
    request: Request,
    next: Next,
) -> Response {
    match gate.check(request.uri().path()).await {
        GateDecision::Proceed => next.run(request).await,
        GateDecision::Block { attribution } => {
            let path = request.uri().path();
            debug!(path = path, "Blocked by maintenance mode");
            maintenance_response(path, &attribution)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
