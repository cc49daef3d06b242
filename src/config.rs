//! Configuration management for the city gallery server.
//!
//! Configuration is read once at startup from command-line arguments or
//! environment variables and then passed explicitly to every component.
//!
//! # Example
//!
//! ```ignore
//! use city_gallery::config::Config;
//!
//! let config = Config::parse();
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (required)
//! - `PASSWORD` - Shared secret for every protected route (required)
//! - `HOSTNAME` - Public hostname used when building image access URLs (required)
//! - `IMAGES_DIR` - Catalog root holding one directory per city (default: images)
//! - `FRONTEND_URL` - Where `/` and `/{city}` redirect to
//! - `AUDIT_DB` - SQLite file for the request log (default: in-memory)
//! - `ACCESS_URLS` - `password` or `signed` (default: password)
//! - `SIGNED_URL_TTL` - Lifetime of signed access URLs in seconds (default: 86400)
//! - `CACHE_MAX_AGE` - Cache-Control max-age for images (default: one year)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: mirror the request)

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default catalog root, relative to the working directory.
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Default redirect target for browser visits.
pub const DEFAULT_FRONTEND_URL: &str = "https://printedwaste.com/v/";

/// Default image Cache-Control max-age in seconds (one year).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 31_536_000;

/// Default lifetime of signed access URLs in seconds (one day).
pub const DEFAULT_SIGNED_URL_TTL: u64 = 86_400;

// =============================================================================
// Access URL Mode
// =============================================================================

/// How image access URLs in listing responses carry the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessUrlMode {
    /// Embed the shared secret as `?password=...`.
    Password,

    /// Embed a time-limited HMAC signature (`?exp=...&sig=...`).
    Signed,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// City Gallery - an authenticated image server for city photo collections.
#[derive(Parser, Debug, Clone)]
#[command(name = "city-gallery")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    pub port: u16,

    /// Public hostname used when building image access URLs.
    #[arg(long, env = "HOSTNAME")]
    pub hostname: String,

    // =========================================================================
    // Authentication
    // =========================================================================
    /// Shared secret required by every protected route.
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    pub password: String,

    /// How access URLs in listing responses carry the credential.
    #[arg(long, value_enum, default_value_t = AccessUrlMode::Password, env = "ACCESS_URLS")]
    pub access_urls: AccessUrlMode,

    /// Lifetime of signed access URLs in seconds.
    #[arg(long, default_value_t = DEFAULT_SIGNED_URL_TTL, env = "SIGNED_URL_TTL")]
    pub signed_url_ttl: u64,

    // =========================================================================
    // Catalog
    // =========================================================================
    /// Directory containing one subdirectory per city.
    #[arg(long, default_value = DEFAULT_IMAGES_DIR, env = "IMAGES_DIR")]
    pub images_dir: PathBuf,

    /// HTTP Cache-Control max-age in seconds for image responses.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Frontend that `/` and `/{city}` redirect to.
    #[arg(long, default_value = DEFAULT_FRONTEND_URL, env = "FRONTEND_URL")]
    pub frontend_url: String,

    // =========================================================================
    // Audit Log
    // =========================================================================
    /// SQLite file for the request audit log.
    ///
    /// If not specified, the log is kept in an in-memory database.
    #[arg(long, env = "AUDIT_DB")]
    pub audit_db: Option<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, the request origin is mirrored back.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
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

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.password.is_empty() {
            return Err("A shared secret is required. Set --password or PASSWORD".to_string());
        }

        if self.hostname.trim().is_empty() {
            return Err("A public hostname is required. Set --hostname or HOSTNAME".to_string());
        }

        if !self.images_dir.is_dir() {
            return Err(format!(
                "Images directory {} does not exist or is not a directory",
                self.images_dir.display()
            ));
        }

        if url::Url::parse(&self.frontend_url).is_err() {
            return Err(format!("Invalid frontend URL: {}", self.frontend_url));
        }

        if self.access_urls == AccessUrlMode::Signed && self.signed_url_ttl == 0 {
            return Err("signed_url_ttl must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the bind address into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind_address()
            .parse()
            .map_err(|e| format!("Invalid bind address {}: {}", self.bind_address(), e))
    }
}

// =============================================================================
// Tests
// =============================================================================
