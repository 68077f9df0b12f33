//! Configuration management for the gateway.
//!
//! This module provides the CLI, built with clap, supporting:
//! - Command-line arguments
//! - Environment variable fallbacks
//! - Sensible defaults for every option
//!
//! # Commands
//!
//! - `serve` (default) - Start the gateway
//! - `check` - Validate the settings file and list the plugin manifest
//!
//! # Environment Variables
//!
//! - `GATEWAY_HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 4000)
//! - `GATEWAY_SETTINGS` - Settings file (default: src/settings.json)
//! - `GATEWAY_PAGE_DIR` - Documentation page directory (default: api-page)
//! - `GATEWAY_MEDIA_DIR` - Media directory (default: src)
//! - `GATEWAY_RATE_LIMIT_WINDOW` - Rate-limit window in seconds (default: 60)
//! - `GATEWAY_RATE_LIMIT_MAX` - Requests per client per window (default: 15)
//! - `GATEWAY_TRUST_PROXY` - Identify clients by `X-Forwarded-For` (default: true)
//! - `GATEWAY_UPSTREAM_TIMEOUT` - Plugin upstream timeout in seconds (default: 30)
//! - `GATEWAY_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "src/settings.json";

/// Default documentation page directory.
pub const DEFAULT_PAGE_DIR: &str = "api-page";

/// Default media directory.
pub const DEFAULT_MEDIA_DIR: &str = "src";

/// Default rate-limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default upstream timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI
// =============================================================================

/// API Gateway - many third-party-backed endpoints behind one process.
///
/// Running without a subcommand starts the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "api-gateway")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Gateway subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the gateway
    Serve(ServeConfig),

    /// Validate the settings file and list the plugin manifest
    Check(CheckConfig),
}

// =============================================================================
// Serve Configuration
// =============================================================================

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GATEWAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    // =========================================================================
    // Files
    // =========================================================================
    /// Settings file, read at startup and on every gated request.
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH, env = "GATEWAY_SETTINGS")]
    pub settings: PathBuf,

    /// Directory holding the documentation page, its assets and notifications.
    #[arg(long, default_value = DEFAULT_PAGE_DIR, env = "GATEWAY_PAGE_DIR")]
    pub page_dir: PathBuf,

    /// Directory holding images served under /src.
    #[arg(long, default_value = DEFAULT_MEDIA_DIR, env = "GATEWAY_MEDIA_DIR")]
    pub media_dir: PathBuf,

    // =========================================================================
    // Rate Limiting
    // =========================================================================
    /// Rate-limit window in seconds.
    #[arg(
        long,
        default_value_t = DEFAULT_RATE_LIMIT_WINDOW_SECS,
        env = "GATEWAY_RATE_LIMIT_WINDOW"
    )]
    pub rate_limit_window: u64,

    /// Requests admitted per client per window.
    #[arg(
        long,
        default_value_t = crate::server::DEFAULT_RATE_LIMIT_MAX,
        env = "GATEWAY_RATE_LIMIT_MAX"
    )]
    pub rate_limit_max: u32,

    /// Identify clients by the leftmost X-Forwarded-For address.
    ///
    /// Turn off when the gateway is not behind a reverse proxy.
    #[arg(
        long,
        default_value_t = true,
        env = "GATEWAY_TRUST_PROXY",
        action = ArgAction::Set
    )]
    pub trust_proxy: bool,

    // =========================================================================
    // Plugins
    // =========================================================================
    /// Timeout in seconds for upstream calls made by plugins.
    #[arg(
        long,
        default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS,
        env = "GATEWAY_UPSTREAM_TIMEOUT"
    )]
    pub upstream_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "GATEWAY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host must not be empty. Set --host or GATEWAY_HOST".to_string());
        }

        if self.rate_limit_window == 0 {
            return Err("rate_limit_window must be greater than 0".to_string());
        }
        if self.rate_limit_max == 0 {
            return Err("rate_limit_max must be greater than 0".to_string());
        }

        if self.upstream_timeout == 0 {
            return Err("upstream_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rate-limit window as a duration.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    /// Upstream timeout as a duration.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }
}

// =============================================================================
// Check Configuration
// =============================================================================

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Settings file to validate.
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH, env = "GATEWAY_SETTINGS")]
    pub settings: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
