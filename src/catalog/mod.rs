//! Image catalog layer.
//!
//! The catalog is a directory tree with one subdirectory per city. Every
//! listing is read from disk at call time; nothing is cached.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ImageCatalog                │
//! │  (all cities, dedup, access URLs)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        CatalogResolver Trait            │
//! │  (list cities/images, resolve paths)    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!            ┌─────────────────┐
//!            │    FsCatalog    │
//!            │ (local folders) │
//!            └─────────────────┘
//! ```

mod aggregator;
mod entry;
mod fs;

pub use aggregator::{dedup_by_name, ImageCatalog};
pub use entry::{image_path, AccessUrlBuilder, ImageEntry};
pub use fs::{is_plain_component, FsCatalog};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::CatalogError;

/// Storage backend for the image catalog.
///
/// Implementations must recompute listings on every call and must never
/// resolve a path outside of their catalog root.
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    /// List city names, in the order the backend enumerates them.
    async fn list_cities(&self) -> Result<Vec<String>, CatalogError>;

    /// List image file names inside a city.
    ///
    /// An unknown city yields an empty list rather than an error.
    async fn list_city(&self, city: &str) -> Result<Vec<String>, CatalogError>;

    /// Resolve a city/image pair to a readable file.
    async fn resolve_image(&self, city: &str, image: &str) -> Result<PathBuf, CatalogError>;
}
