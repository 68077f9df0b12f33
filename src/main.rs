//! API Gateway - many third-party-backed endpoints behind one process.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::{
    build_gateway,
    config::{CheckConfig, Cli, Command, ServeConfig},
    manifest, FileSettings, GatewaySettings, PluginContext, RouteRegistry, RouterConfig,
    SettingsSource,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    // The settings must be readable before any connection is accepted
    let file_settings = FileSettings::new(config.settings.clone());
    let settings = match file_settings.load_blocking() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Settings: {}", config.settings.display());
    info!("  Creator: {}", settings.attribution_name);
    info!("  Page dir: {}", config.page_dir.display());
    info!("  Media dir: {}", config.media_dir.display());
    info!(
        "  Rate limit: {} requests / {}s per client",
        config.rate_limit_max, config.rate_limit_window
    );
    if config.trust_proxy {
        info!("  Client identity: X-Forwarded-For, then peer address");
    } else {
        info!("  Client identity: peer address");
    }
    if settings.maintenance_enabled {
        warn!("  Maintenance: ENABLED - non-exempt requests get 503");
    } else {
        info!("  Maintenance: disabled");
    }

    let context = match PluginContext::with_timeout(config.upstream_timeout()) {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to build upstream HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Register every plugin before binding
    info!("");
    info!("Loading route modules...");
    let router_config = build_router_config(&config, &settings);
    let source: Arc<dyn SettingsSource> = Arc::new(file_settings);
    let gateway = build_gateway(source, manifest(), context, router_config);

    for failure in &gateway.report.failures {
        warn!("  Skipped {}: {}", failure.module, failure.error);
    }

    let _sweeper = gateway.limiter.spawn_sweeper();

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/settings", addr);
    for route in gateway.report.routes.iter().take(3) {
        info!("    curl http://{}{}", addr, route.path);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let service = gateway
        .router
        .into_make_service_with_connect_info::<SocketAddr>();

    if let Err(e) = axum::serve(listener, service).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!(" █████╗ ██████╗ ██╗");
    info!("██╔══██╗██╔══██╗██║");
    info!("███████║██████╔╝██║");
    info!("██╔══██║██╔═══╝ ██║");
    info!("██║  ██║██║     ██║");
    info!("╚═╝  ╚═╝╚═╝     ╚═╝");
    info!("");
    info!("   G A T E W A Y   v{}", version);
    info!("");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "api_gateway=debug,tower_http=debug"
    } else {
        "api_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the ServeConfig and the startup settings.
fn build_router_config(config: &ServeConfig, settings: &GatewaySettings) -> RouterConfig {
    let mut router_config = RouterConfig::new(settings.attribution_name.clone())
        .with_rate_limit(config.rate_limit_window(), config.rate_limit_max)
        .with_trust_proxy(config.trust_proxy)
        .with_page_dir(config.page_dir.clone())
        .with_media_dir(config.media_dir.clone());

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config = router_config.with_tracing(!config.no_tracing);

    router_config
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("API Gateway Configuration Check");
    println!("═════════════════════════════════");
    println!();

    let settings = match FileSettings::new(config.settings.clone()).load_blocking() {
        Ok(settings) => {
            println!("✓ Settings: {}", config.settings.display());
            settings
        }
        Err(e) => {
            println!("✗ Settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("  Creator: {}", settings.attribution_name);
    println!(
        "  Maintenance: {}",
        if settings.maintenance_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Exempt paths:");
    for prefix in &settings.maintenance_exempt_prefixes {
        println!("    {}", prefix);
    }
    println!();

    // Dry-run registration against an empty router
    println!("Route modules:");
    println!("──────────────");

    let loaded = RouteRegistry::new(axum::Router::new(), PluginContext::default())
        .reserve(api_gateway::server::BUILTIN_PATHS.iter().copied())
        .load_all(manifest());

    for route in &loaded.report.routes {
        println!("  ✓ {:<24} {}", route.module, route.path);
    }
    for failure in &loaded.report.failures {
        println!("  ✗ {:<24} {}", failure.module, failure.error);
    }

    println!();
    println!("Total: {} module(s) loaded", loaded.report.loaded);

    if !loaded.report.failures.is_empty() {
        println!();
        println!("═════════════════════════════════");
        println!("✗ {} module(s) failed to load", loaded.report.failures.len());
        return ExitCode::FAILURE;
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
