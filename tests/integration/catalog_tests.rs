//! Catalog integration tests over a real directory tree.
//!
//! Tests verify:
//! - Cities are directories, images are regular files
//! - Listings are recomputed on every call
//! - Resolution stays inside the catalog root
//! - Access URLs percent-encode names and carry the credential

use std::time::Duration;

use city_gallery::catalog::{AccessUrlBuilder, CatalogResolver, FsCatalog, ImageCatalog};
use city_gallery::error::CatalogError;
use city_gallery::server::SignedUrlAuth;

use super::test_utils::{expected_location, MockCatalog, TestTree, TEST_HOSTNAME, TEST_PASSWORD};

fn password_urls() -> AccessUrlBuilder {
    AccessUrlBuilder::with_password(TEST_HOSTNAME, TEST_PASSWORD)
}

#[tokio::test]
async fn test_fs_catalog_lists_directories_and_files() {
    let tree = TestTree::standard();
    std::fs::write(tree.root().join("stray.jpg"), b"x").unwrap();
    std::fs::create_dir(tree.root().join("la").join("thumbs")).unwrap();

    let catalog = FsCatalog::new(tree.root());

    let mut cities = catalog.list_cities().await.unwrap();
    cities.sort();
    assert_eq!(cities, vec!["la", "nyc"]);

    let mut images = catalog.list_city("la").await.unwrap();
    images.sort();
    assert_eq!(images, vec!["a.jpg", "b.jpg"]);
}

#[tokio::test]
async fn test_fs_catalog_missing_root_is_empty() {
    let tree = TestTree::empty();
    let catalog = FsCatalog::new(tree.root().join("does-not-exist"));

    assert!(catalog.list_cities().await.unwrap().is_empty());
    assert!(catalog.list_city("nyc").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fs_catalog_resolve() {
    let tree = TestTree::standard();
    let catalog = FsCatalog::new(tree.root());

    let path = catalog.resolve_image("nyc", "a.jpg").await.unwrap();
    assert!(path.ends_with("nyc/a.jpg"));

    let err = catalog.resolve_image("nyc", "b.jpg").await.unwrap_err();
    assert!(matches!(err, CatalogError::ImageNotFound { .. }));

    let err = catalog.resolve_image("..", "secret.txt").await.unwrap_err();
    assert!(matches!(err, CatalogError::TraversalRejected { .. }));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_image_catalog_city_listing_urls() {
    let tree = TestTree::standard();
    let catalog = ImageCatalog::new(FsCatalog::new(tree.root()), password_urls());

    let entries = catalog.list_city("nyc").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a.jpg");
    assert_eq!(entries[0].city, "nyc");
    assert_eq!(entries[0].location, expected_location("nyc", "a.jpg"));
}

#[tokio::test]
async fn test_image_catalog_encodes_names() {
    let tree = TestTree::empty();
    tree.add_image("new york", "sky line.jpg", b"x");
    let catalog = ImageCatalog::new(FsCatalog::new(tree.root()), password_urls());

    let entries = catalog.list_city("new york").await.unwrap();
    assert_eq!(
        entries[0].location,
        format!(
            "https://{}/new%20york/sky%20line.jpg?password={}",
            TEST_HOSTNAME, TEST_PASSWORD
        )
    );
}

#[tokio::test]
async fn test_image_catalog_dedup_keeps_first_city() {
    let catalog = ImageCatalog::new(
        MockCatalog::new()
            .with_city("nyc", &["a.jpg", "A.jpg"])
            .with_city("la", &["a.jpg", "b.jpg"])
            .with_city("sf", &["b.jpg", "c.jpg"]),
        password_urls(),
    );

    let entries = catalog.list_all_images().await.unwrap();
    let summary: Vec<(&str, &str)> = entries
        .iter()
        .map(|e| (e.name.as_str(), e.city.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a.jpg", "nyc"),
            ("A.jpg", "nyc"),
            ("b.jpg", "la"),
            ("c.jpg", "sf"),
        ]
    );
}

#[tokio::test]
async fn test_image_catalog_signed_urls() {
    let tree = TestTree::standard();
    let auth = SignedUrlAuth::new(TEST_PASSWORD);
    let catalog = ImageCatalog::new(
        FsCatalog::new(tree.root()),
        AccessUrlBuilder::with_signing(TEST_HOSTNAME, auth, Duration::from_secs(60)),
    );

    let entries = catalog.list_city("nyc").await.unwrap();
    let location = &entries[0].location;
    assert!(location.starts_with(&format!("https://{}/nyc/a.jpg?exp=", TEST_HOSTNAME)));
    assert!(!location.contains("password"));
}
