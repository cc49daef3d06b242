//! Test utilities for integration tests.
//!
//! This module provides a temporary on-disk catalog, an in-memory catalog
//! with a fixed enumeration order, and helpers for building requests and
//! reading responses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tempfile::TempDir;
use tower::ServiceExt;

use city_gallery::audit::{AuditLog, AuditRecord, MemoryAuditSink};
use city_gallery::catalog::{AccessUrlBuilder, CatalogResolver, FsCatalog, ImageCatalog};
use city_gallery::error::CatalogError;
use city_gallery::server::{create_router, RouterConfig};

pub const TEST_PASSWORD: &str = "hunter2";
pub const TEST_HOSTNAME: &str = "images.example.com";

/// Bytes written for `nyc/a.jpg`.
pub const NYC_A: &[u8] = b"\xFF\xD8\xFFnyc-a\xFF\xD9";
/// Bytes written for `la/a.jpg`.
pub const LA_A: &[u8] = b"\xFF\xD8\xFFla-a\xFF\xD9";
/// Bytes written for `la/b.jpg`.
pub const LA_B: &[u8] = b"\xFF\xD8\xFFla-b\xFF\xD9";

// =============================================================================
// On-Disk Catalog
// =============================================================================

/// A catalog tree in a temporary directory.
///
/// ```text
/// <tmp>/
///   secret.txt        (outside the catalog root)
///   images/
///     nyc/a.jpg
///     la/a.jpg
///     la/b.jpg
/// ```
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Create the standard two-city tree.
    pub fn standard() -> Self {
        let tree = Self::empty();
        tree.add_image("nyc", "a.jpg", NYC_A);
        tree.add_image("la", "a.jpg", LA_A);
        tree.add_image("la", "b.jpg", LA_B);
        std::fs::write(tree.dir.path().join("secret.txt"), b"top secret").unwrap();
        tree
    }

    /// Create a tree with an empty catalog root.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        Self { dir }
    }

    /// Catalog root directory.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    /// Write an image, creating the city directory if needed.
    pub fn add_image(&self, city: &str, name: &str, data: &[u8]) -> PathBuf {
        let city_dir = self.root().join(city);
        std::fs::create_dir_all(&city_dir).unwrap();
        let path = city_dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Remove an image from disk.
    pub fn remove_image(&self, city: &str, name: &str) {
        std::fs::remove_file(self.root().join(city).join(name)).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

// =============================================================================
// Mock Catalog
// =============================================================================

/// A catalog with a fixed city enumeration order.
///
/// Used where results depend on enumeration order, which the filesystem does
/// not guarantee.
#[derive(Clone, Default)]
pub struct MockCatalog {
    cities: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(self, city: &str, images: &[&str]) -> Self {
        self.cities.lock().push((
            city.to_string(),
            images.iter().map(|name| name.to_string()).collect(),
        ));
        self
    }
}

#[async_trait]
impl CatalogResolver for MockCatalog {
    async fn list_cities(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .cities
            .lock()
            .iter()
            .map(|(city, _)| city.clone())
            .collect())
    }

    async fn list_city(&self, city: &str) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .cities
            .lock()
            .iter()
            .find(|(name, _)| name == city)
            .map(|(_, images)| images.clone())
            .unwrap_or_default())
    }

    async fn resolve_image(&self, city: &str, image: &str) -> Result<PathBuf, CatalogError> {
        Err(CatalogError::ImageNotFound {
            city: city.to_string(),
            image: image.to_string(),
        })
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// A router wired to an in-memory audit sink.
pub struct TestApp {
    pub router: Router,
    pub audit: AuditLog,
    pub sink: MemoryAuditSink,
}

impl TestApp {
    /// Build an app over any catalog with the given router configuration.
    pub fn with_config<C: CatalogResolver + 'static>(resolver: C, config: RouterConfig) -> Self {
        let catalog = ImageCatalog::new(
            resolver,
            AccessUrlBuilder::with_password(TEST_HOSTNAME, TEST_PASSWORD),
        );
        Self::with_catalog(catalog, config)
    }

    /// Build an app over a prepared catalog.
    pub fn with_catalog<C: CatalogResolver + 'static>(
        catalog: ImageCatalog<C>,
        config: RouterConfig,
    ) -> Self {
        let sink = MemoryAuditSink::new();
        let audit = AuditLog::spawn(sink.clone()).unwrap();
        let router = create_router(catalog, audit.clone(), config);
        Self {
            router,
            audit,
            sink,
        }
    }

    /// Build an app over an on-disk tree with default settings.
    pub fn fs(tree: &TestTree) -> Self {
        Self::with_config(FsCatalog::new(tree.root()), test_config())
    }

    /// Build an app over a mock catalog with default settings.
    pub fn mock(catalog: MockCatalog) -> Self {
        Self::with_config(catalog, test_config())
    }

    /// Send a request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Audit records written so far.
    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.flush().await.unwrap();
        self.sink.records()
    }
}

/// Router configuration used by most tests.
pub fn test_config() -> RouterConfig {
    RouterConfig::new(TEST_PASSWORD).with_tracing(false)
}

// =============================================================================
// Request Helpers
// =============================================================================

/// `Authorization` header value for basic auth with any username.
pub fn basic_auth(password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("viewer:{}", password)))
}

/// Build a GET request.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Build a request authenticated with basic auth.
pub fn with_basic(method: &str, uri: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth(password))
        .body(Body::empty())
        .unwrap()
}

/// Build an image request carrying a password query parameter.
pub fn image_request(city: &str, image: &str, password: &str) -> Request<Body> {
    get(&format!("/{}/{}?password={}", city, image, password))
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Expected access URL for an image in password mode.
pub fn expected_location(city: &str, name: &str) -> String {
    format!(
        "https://{}/{}/{}?password={}",
        TEST_HOSTNAME, city, name, TEST_PASSWORD
    )
}
