//! Filesystem-backed catalog.
//!
//! Cities are the directories directly under the catalog root and images are
//! the regular files directly inside a city. Symlinks are followed, but a
//! resolved image must still live under the canonical catalog root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::CatalogError;

use super::CatalogResolver;

/// Returns true if `name` is exactly one normal path component.
///
/// Rejects empty names, `.`, `..`, anything containing a separator or NUL,
/// and platform prefixes such as `C:`.
pub fn is_plain_component(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Catalog rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    root: PathBuf,
}

impl FsCatalog {
    /// Create a catalog over the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the catalog root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the names of directory entries matching `keep`, in enumeration order.
    async fn read_names<F>(dir: &Path, keep: F) -> Result<Vec<String>, CatalogError>
    where
        F: Fn(&std::fs::Metadata) -> bool,
    {
        let mut entries = fs::read_dir(dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            // fs::metadata follows symlinks; dangling links are skipped
            let Ok(metadata) = fs::metadata(&path).await else {
                debug!(path = %path.display(), "Skipping unreadable catalog entry");
                continue;
            };
            if !keep(&metadata) {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(name = ?name, "Skipping non UTF-8 catalog entry"),
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl CatalogResolver for FsCatalog {
    async fn list_cities(&self) -> Result<Vec<String>, CatalogError> {
        match fs::metadata(&self.root).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        Self::read_names(&self.root, |m| m.is_dir()).await
    }

    async fn list_city(&self, city: &str) -> Result<Vec<String>, CatalogError> {
        if !is_plain_component(city) {
            debug!(city = city, "Listing requested for invalid city name");
            return Ok(Vec::new());
        }

        let dir = self.root.join(city);
        match fs::metadata(&dir).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        Self::read_names(&dir, |m| m.is_file()).await
    }

    async fn resolve_image(&self, city: &str, image: &str) -> Result<PathBuf, CatalogError> {
        let not_found = || CatalogError::ImageNotFound {
            city: city.to_string(),
            image: image.to_string(),
        };
        let rejected = || CatalogError::TraversalRejected {
            city: city.to_string(),
            image: image.to_string(),
        };

        if !is_plain_component(city) || !is_plain_component(image) {
            warn!(city = city, image = image, "Rejected image path with traversal segments");
            return Err(rejected());
        }

        let candidate = self.root.join(city).join(image);
        let resolved = match fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => return Err(e.into()),
            Err(_) => return Err(not_found()),
        };

        let root = fs::canonicalize(&self.root).await?;
        if !resolved.starts_with(&root) {
            warn!(
                city = city,
                image = image,
                resolved = %resolved.display(),
                "Rejected image path resolving outside the catalog root"
            );
            return Err(rejected());
        }

        let metadata = fs::metadata(&resolved).await?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(resolved)
    }
}

// =============================================================================
// Tests
// =============================================================================
