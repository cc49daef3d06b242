//! Cross-city view of the catalog.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::error::CatalogError;

use super::entry::{AccessUrlBuilder, ImageEntry};
use super::CatalogResolver;

/// Drop entries whose name was already seen, keeping the first occurrence.
///
/// Names are compared exactly (case-sensitive).
pub fn dedup_by_name(entries: Vec<ImageEntry>) -> Vec<ImageEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.name.clone()))
        .collect()
}

/// Aggregates a [`CatalogResolver`] across all cities and attaches access URLs.
pub struct ImageCatalog<C: CatalogResolver> {
    resolver: C,
    urls: AccessUrlBuilder,
}

impl<C: CatalogResolver> ImageCatalog<C> {
    /// Create a catalog view over a resolver.
    pub fn new(resolver: C, urls: AccessUrlBuilder) -> Self {
        Self { resolver, urls }
    }

    /// Get the underlying resolver.
    pub fn resolver(&self) -> &C {
        &self.resolver
    }

    /// Get the access URL builder.
    pub fn urls(&self) -> &AccessUrlBuilder {
        &self.urls
    }

    /// List all city names in enumeration order.
    pub async fn list_all_cities(&self) -> Result<Vec<String>, CatalogError> {
        self.resolver.list_cities().await
    }

    /// List the images of a single city. Not deduplicated.
    pub async fn list_city(&self, city: &str) -> Result<Vec<ImageEntry>, CatalogError> {
        let names = self.resolver.list_city(city).await?;
        Ok(names
            .iter()
            .map(|name| self.urls.entry(city, name))
            .collect())
    }

    /// List every image across all cities, unique by file name.
    ///
    /// Cities are visited in enumeration order and the first city holding a
    /// given file name wins.
    pub async fn list_all_images(&self) -> Result<Vec<ImageEntry>, CatalogError> {
        let mut all = Vec::new();
        for city in self.resolver.list_cities().await? {
            all.extend(self.list_city(&city).await?);
        }

        let total = all.len();
        let images = dedup_by_name(all);
        if images.len() < total {
            debug!(
                total = total,
                unique = images.len(),
                "Dropped duplicate image names across cities"
            );
        }

        Ok(images)
    }

    /// Resolve a city/image pair to a readable file.
    pub async fn resolve_image(&self, city: &str, image: &str) -> Result<PathBuf, CatalogError> {
        self.resolver.resolve_image(city, image).await
    }
}
