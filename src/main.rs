//! City Gallery - an authenticated image server for city photo collections.
//!
//! This binary starts the HTTP server and configures all components.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use city_gallery::{
    audit::{AuditLog, SqliteAuditSink},
    catalog::{AccessUrlBuilder, FsCatalog, ImageCatalog},
    config::{AccessUrlMode, Config},
    server::{auth::SignedUrlAuth, create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let frontend_url = match Url::parse(&config.frontend_url) {
        Ok(url) => url,
        Err(e) => {
            error!("Configuration error: invalid frontend URL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print_config(&config);

    // Open the audit log
    let sink = match &config.audit_db {
        Some(path) => SqliteAuditSink::open(path),
        None => SqliteAuditSink::in_memory(),
    };
    let audit = match sink.and_then(AuditLog::spawn) {
        Ok(audit) => audit,
        Err(e) => {
            error!("Failed to open audit log: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Create the catalog
    let catalog = ImageCatalog::new(
        FsCatalog::new(&config.images_dir),
        build_access_urls(&config),
    );

    // Create router
    let router = create_router(catalog, audit, build_router_config(&config, frontend_url));

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl -u :<password> http://{}/cities", addr);
    info!("    curl -u :<password> -X POST http://{}/images", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Log the effective configuration. The shared secret is never logged.
fn print_config(config: &Config) {
    info!("City Gallery v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Images: {}", config.images_dir.display());
    info!("  Public hostname: {}", config.hostname);
    info!("  Frontend: {}", config.frontend_url);
    match &config.audit_db {
        Some(path) => info!("  Audit log: {}", path.display()),
        None => warn!("  Audit log: in-memory, records are lost on exit"),
    }
    match config.access_urls {
        AccessUrlMode::Password => {
            warn!("  Access URLs: embed the shared secret");
            warn!("        Use --access-urls=signed to hand out expiring signatures instead");
        }
        AccessUrlMode::Signed => info!(
            "  Access URLs: signed, valid for {}s",
            config.signed_url_ttl
        ),
    }
    info!("  Cache max-age: {}s", config.cache_max_age);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "city_gallery=debug,tower_http=debug"
    } else {
        "city_gallery=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the access URL builder for listing responses.
fn build_access_urls(config: &Config) -> AccessUrlBuilder {
    match config.access_urls {
        AccessUrlMode::Password => {
            AccessUrlBuilder::with_password(&config.hostname, config.password.clone())
        }
        AccessUrlMode::Signed => AccessUrlBuilder::with_signing(
            &config.hostname,
            SignedUrlAuth::new(&config.password),
            Duration::from_secs(config.signed_url_ttl),
        ),
    }
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config, frontend_url: Url) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.password.clone())
        .with_signed_urls(config.access_urls == AccessUrlMode::Signed)
        .with_cache_max_age(config.cache_max_age)
        .with_frontend_url(frontend_url);

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config = router_config.with_tracing(!config.no_tracing);

    router_config
}
