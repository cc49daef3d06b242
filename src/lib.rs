//! # City Gallery
//!
//! An authenticated image server for city photo collections stored on local
//! disk.
//!
//! The catalog is a directory tree: one subdirectory per city, one file per
//! image. Every listing is read from disk when requested, so adding or
//! removing files takes effect immediately.
//!
//! ## Features
//!
//! - **Image serving**: streams files with long-lived cache headers
//! - **Listings**: cities, one city's images, or every image unique by name
//! - **Shared-secret auth**: query token for images, HTTP Basic for listings
//! - **Signed access URLs**: optional HMAC-SHA256 URLs instead of the raw secret
//! - **Audit log**: every request is appended to a SQLite table
//!
//! ## Architecture
//!
//! - [`catalog`] - Directory-backed catalog, deduplication, access URLs
//! - [`audit`] - Append-only request log and its storage sinks
//! - [`server`] - Axum routes, handlers and authentication middleware
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//!
//! use city_gallery::{
//!     create_router, AccessUrlBuilder, AuditLog, FsCatalog, ImageCatalog, RouterConfig,
//!     SqliteAuditSink,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ImageCatalog::new(
//!         FsCatalog::new("images"),
//!         AccessUrlBuilder::with_password("images.example.com", "hunter2"),
//!     );
//!     let audit = AuditLog::spawn(SqliteAuditSink::in_memory()?)?;
//!     let router = create_router(catalog, audit, RouterConfig::new("hunter2"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(
//!         listener,
//!         router.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use audit::{AuditEntry, AuditLog, AuditRecord, AuditSink, MemoryAuditSink, SqliteAuditSink};
pub use catalog::{
    dedup_by_name, AccessUrlBuilder, CatalogResolver, FsCatalog, ImageCatalog, ImageEntry,
};
pub use config::{AccessUrlMode, Config};
pub use error::{AuditError, CatalogError};
pub use server::{
    create_router, AppState, AuthError, AuthScheme, ErrorResponse, RouterConfig, SharedSecret,
    SignedUrlAuth,
};
