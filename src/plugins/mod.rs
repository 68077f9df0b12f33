//! Endpoint plugins.
//!
//! Each plugin is a [`RouteModule`]: it has an identity (`category/name`) and
//! a registrar that attaches zero or more routes to a [`RouteScope`]. Plugins
//! are linked into the binary and listed in [`manifest`]; the
//! [`RouteRegistry`] walks that list once at startup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 manifest()                   │
//! │   random/blue-archive  tools/remini  ...     │
//! └──────────────────────┬───────────────────────┘
//!                        │  Box<dyn RouteModule>
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │               RouteRegistry                  │
//! │  register → validate → merge (or skip + log) │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                        ▼
//!                  axum::Router
//! ```
//!
//! # Writing a plugin
//!
//! ```ignore
//! use axum::routing::get;
//! use api_gateway::plugins::{RouteModule, RouteScope};
//! use api_gateway::PluginError;
//!
//! struct Ping;
//!
//! impl RouteModule for Ping {
//!     fn identity(&self) -> &str {
//!         "tools/ping"
//!     }
//!
//!     fn register(&self, scope: &mut RouteScope<'_>) -> Result<(), PluginError> {
//!         scope.route("/tools/ping", get(|| async { "pong" }));
//!         Ok(())
//!     }
//! }
//! ```

pub mod image;
mod loader;
pub mod random;
pub mod tools;

use std::time::Duration;

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Json,
};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::PluginError;

pub use loader::{LoadFailure, LoadReport, LoadedRoutes, RegisteredRoute, RouteRegistry};

/// Default timeout for upstream calls made by plugins.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Plugin Contract
// =============================================================================

/// An endpoint plugin.
///
/// `register` is called exactly once, at startup, before the listener opens.
/// Returning an error (or panicking) skips the module without affecting the
/// others; routes it added before failing are discarded.
pub trait RouteModule: Send + Sync {
    /// Identity used in logs, as `category/name`.
    fn identity(&self) -> &str;

    /// Attach this module's routes.
    fn register(&self, scope: &mut RouteScope<'_>) -> Result<(), PluginError>;
}

/// Resources shared with every plugin.
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    http: reqwest::Client,
}

impl PluginContext {
    /// Create a context around an existing HTTP client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Create a context whose HTTP client gives up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("api-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Shared HTTP client for upstream calls.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Route collector handed to a registrar.
///
/// Routes are only merged into the router once the registrar returns
/// successfully and every path passes validation.
pub struct RouteScope<'a> {
    identity: &'a str,
    context: &'a PluginContext,
    routes: Vec<(String, MethodRouter)>,
}

impl<'a> RouteScope<'a> {
    pub(crate) fn new(identity: &'a str, context: &'a PluginContext) -> Self {
        Self {
            identity,
            context,
            routes: Vec::new(),
        }
    }

    /// Identity of the module being registered.
    pub fn identity(&self) -> &str {
        self.identity
    }

    /// Shared plugin resources.
    pub fn context(&self) -> &PluginContext {
        self.context
    }

    /// Shared HTTP client for upstream calls.
    pub fn http(&self) -> &reqwest::Client {
        self.context.http()
    }

    /// Attach a handler to a path.
    pub fn route(&mut self, path: impl Into<String>, method_router: MethodRouter) -> &mut Self {
        self.routes.push((path.into(), method_router));
        self
    }

    /// Paths attached so far.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(path, _)| path.as_str())
    }

    pub(crate) fn into_routes(self) -> Vec<(String, MethodRouter)> {
        self.routes
    }
}

/// Every plugin linked into the gateway.
pub fn manifest() -> Vec<Box<dyn RouteModule>> {
    vec![
        Box::new(random::BlueArchive),
        Box::new(tools::Remini),
        Box::new(image::StickerSearch),
    ]
}

// =============================================================================
// Plugin Failures
// =============================================================================

/// Failure reported by a plugin handler as `{"status": false, "message": ...}`.
///
/// The envelope adds `creator` on the way out.
#[derive(Debug, Clone)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    /// Create a failure with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Invalid or missing parameters (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The upstream call failed (500).
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status of this failure.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message sent to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self {
        ApiFailure::upstream(format!("Upstream request failed: {}", err))
    }
}

/// Query strings the handler cannot decode are reported without the decoder's text.
impl From<QueryRejection> for ApiFailure {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Query rejected: {}", rejection.body_text());
        ApiFailure::bad_request("Invalid query parameters")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "Plugin failure: {}", self.message);
        } else {
            warn!(status = self.status.as_u16(), "Plugin rejected request: {}", self.message);
        }

        (
            self.status,
            Json(json!({ "status": false, "message": self.message })),
        )
            .into_response()
    }
}
