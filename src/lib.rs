//! # API Gateway
//!
//! An HTTP gateway serving many small, independent, third-party-backed
//! endpoints from one process.
//!
//! This library provides the request-handling spine: plugin registration,
//! per-client rate limiting, a maintenance switch, a uniform JSON envelope
//! and a fixed mapping from failures to status pages.
//!
//! ## Features
//!
//! - **Plugins**: endpoint modules linked at compile time and registered once at startup
//! - **Rate limiting**: fixed-window counter per client, swept in the background
//! - **Maintenance mode**: toggled live from the settings file, with exempt paths
//! - **Response envelope**: `status` and `creator` added to every JSON object
//! - **Status pages**: a fixed set of HTML pages for every failure class
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`settings`] - Settings document and the sources it is read from
//! - [`plugins`] - Plugin contract, registry and the bundled plugins
//! - [`server`] - Axum-based HTTP server, middleware and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use api_gateway::{build_gateway, manifest, FileSettings, PluginContext, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Arc::new(FileSettings::new("src/settings.json"));
//!     let gateway = build_gateway(
//!         settings,
//!         manifest(),
//!         PluginContext::default(),
//!         RouterConfig::default(),
//!     );
//!     gateway.limiter.spawn_sweeper();
//!
//!     // Serve gateway.router...
//! }
//! ```

pub mod config;
pub mod error;
pub mod plugins;
pub mod server;
pub mod settings;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use error::{GatewayError, PluginError, SettingsError};
pub use plugins::{
    manifest, ApiFailure, LoadFailure, LoadReport, PluginContext, RegisteredRoute, RouteModule,
    RouteRegistry, RouteScope,
};
pub use server::{
    build_gateway, create_router, Admission, Envelope, Gateway, MaintenanceGate, RateLimiter,
    RouterConfig,
};
pub use settings::{FileSettings, GatewaySettings, SettingsSource, StaticSettings};
