//! Router configuration for the gateway.
//!
//! This module assembles the builtin routes, the plugin routes and the
//! middleware stack into one router.
//!
//! # Request Flow
//!
//! ```text
//! CORS
//!  └─ security headers
//!      └─ envelope (rewrites JSON on the way out)
//!          └─ rate limiter          429
//!              └─ maintenance gate  503
//!                  └─ path guard    403
//!                      └─ plain-text rejections → status page
//!                          └─ catch panic   500
//!                              └─ builtin routes / plugin routes
//!                                  └─ fallbacks   404 / 405
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use api_gateway::plugins::{manifest, PluginContext};
//! use api_gateway::server::{build_gateway, RouterConfig};
//! use api_gateway::FileSettings;
//!
//! let settings = Arc::new(FileSettings::new("src/settings.json"));
//! let config = RouterConfig::new("VGX Team")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let gateway = build_gateway(settings, manifest(), PluginContext::default(), config);
//! gateway.limiter.spawn_sweeper();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
//! axum::serve(listener, gateway.router).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::envelope::{envelope_middleware, Envelope};
use super::guard::{path_guard_middleware, security_headers_middleware};
use super::handlers::{
    health_handler, index_handler, media_handler, notifications_handler, preview_image_handler,
    script_handler, settings_handler, styles_handler, AppState, BUILTIN_PATHS,
};
use super::maintenance::{maintenance_middleware, MaintenanceGate};
use super::pages::{
    method_not_allowed_handler, not_found_handler, panic_response, rejection_middleware,
};
use super::rate_limit::{
    rate_limit_middleware, RateLimitState, RateLimiter, DEFAULT_RATE_LIMIT_MAX,
    DEFAULT_RATE_LIMIT_WINDOW,
};
use crate::plugins::{LoadReport, LoadedRoutes, PluginContext, RouteModule, RouteRegistry};
use crate::settings::{SettingsSource, DEFAULT_ATTRIBUTION};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Attribution injected by the response envelope
    pub attribution_name: String,

    /// Length of one rate-limit window
    pub rate_limit_window: Duration,

    /// Requests admitted per client per window
    pub rate_limit_max: u32,

    /// Whether to identify clients by `X-Forwarded-For`
    pub trust_proxy: bool,

    /// Directory holding the documentation page and notifications
    pub page_dir: PathBuf,

    /// Directory holding images
    pub media_dir: PathBuf,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with the given attribution.
    ///
    /// By default:
    /// - 15 requests per client per 60 second window
    /// - `X-Forwarded-For` is trusted
    /// - Pages from `api-page`, media from `src`
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(attribution_name: impl Into<String>) -> Self {
        Self {
            attribution_name: attribution_name.into(),
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            trust_proxy: true,
            page_dir: PathBuf::from("api-page"),
            media_dir: PathBuf::from("src"),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set the rate-limit window and per-window maximum.
    pub fn with_rate_limit(mut self, window: Duration, max_per_window: u32) -> Self {
        self.rate_limit_window = window;
        self.rate_limit_max = max_per_window;
        self
    }

    /// Trust or ignore `X-Forwarded-For`.
    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    /// Set the documentation page directory.
    pub fn with_page_dir(mut self, page_dir: impl Into<PathBuf>) -> Self {
        self.page_dir = page_dir.into();
        self
    }

    /// Set the media directory.
    pub fn with_media_dir(mut self, media_dir: impl Into<PathBuf>) -> Self {
        self.media_dir = media_dir.into();
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ATTRIBUTION)
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// A fully assembled gateway.
#[derive(Debug)]
pub struct Gateway {
    /// Router ready to be served
    pub router: Router,

    /// Limiter shared by the middleware, for the sweeper
    pub limiter: Arc<RateLimiter>,

    /// Plugin registration outcome
    pub report: LoadReport,
}

/// Routes owned by the gateway itself.
pub fn builtin_router(settings: Arc<dyn SettingsSource>, config: &RouterConfig) -> Router {
    let state = AppState::new(settings, config.page_dir.clone(), config.media_dir.clone());

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/assets/styles.css", get(styles_handler))
        .route("/assets/script.js", get(script_handler))
        .route("/api/settings", get(settings_handler))
        .route("/api/notifications", get(notifications_handler))
        .route("/api/preview-image", get(preview_image_handler))
        .route("/src/{*file}", get(media_handler))
        .with_state(state)
}

/// Wrap fully registered routes with the fallbacks and the middleware stack.
pub fn create_router(
    routes: Router,
    settings: Arc<dyn SettingsSource>,
    limiter: Arc<RateLimiter>,
    config: &RouterConfig,
) -> Router {
    let gate = MaintenanceGate::new(settings);
    let rate_limit = RateLimitState {
        limiter,
        trust_proxy: config.trust_proxy,
    };
    let envelope = Envelope::new(config.attribution_name.as_str());
    let cors = build_cors_layer(config);

    let router = routes
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(rejection_middleware))
        .layer(middleware::from_fn(path_guard_middleware))
        .layer(middleware::from_fn_with_state(gate, maintenance_middleware))
        .layer(middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(envelope, envelope_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Register the builtin routes and every module, then apply the middleware.
///
/// Registration completes here, before any listener exists.
pub fn build_gateway(
    settings: Arc<dyn SettingsSource>,
    modules: Vec<Box<dyn RouteModule>>,
    context: PluginContext,
    config: RouterConfig,
) -> Gateway {
    let base = builtin_router(settings.clone(), &config);

    let LoadedRoutes { router, report } = RouteRegistry::new(base, context)
        .reserve(BUILTIN_PATHS.iter().copied())
        .load_all(modules);

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_window,
        config.rate_limit_max,
    ));
    let router = create_router(router, settings, limiter.clone(), &config);

    Gateway {
        router,
        limiter,
        report,
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
