//! HTTP request handlers for the gallery API.
//!
//! # Endpoints
//!
//! - `GET /{city}/{image}` - Serve an image (query-token auth)
//! - `GET /cities` - List cities (basic auth)
//! - `POST /images` - List all images, unique by name (basic auth)
//! - `POST /{city}` - List one city's images (basic auth)
//! - `GET /{city}` - Redirect to the frontend for a city
//! - `GET /` - Redirect to the frontend

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};
use url::Url;

use crate::catalog::{CatalogResolver, ImageCatalog, ImageEntry};
use crate::error::CatalogError;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers.
pub struct AppState<C: CatalogResolver> {
    /// The catalog every listing and image lookup goes through
    pub catalog: Arc<ImageCatalog<C>>,

    /// Cache-Control max-age for image responses, in seconds
    pub cache_max_age: u32,

    /// Redirect target for browser visits
    pub frontend_url: Arc<Url>,
}

impl<C: CatalogResolver> AppState<C> {
    pub fn new(catalog: ImageCatalog<C>, cache_max_age: u32, frontend_url: Url) -> Self {
        Self {
            catalog: Arc::new(catalog),
            cache_max_age,
            frontend_url: Arc::new(frontend_url),
        }
    }
}

impl<C: CatalogResolver> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            cache_max_age: self.cache_max_age,
            frontend_url: Arc::clone(&self.frontend_url),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for image requests: `/{city}/{image}`
#[derive(Debug, Deserialize)]
pub struct ImagePathParams {
    pub city: String,
    pub image: String,
}

/// Path parameters for city routes: `/{city}`
#[derive(Debug, Deserialize)]
pub struct CityPathParams {
    pub city: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error envelope: `{"status": false, "errors": [...]}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: bool,
    pub errors: Vec<String>,
}

impl ErrorResponse {
    /// Create an error envelope with a single message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: false,
            errors: vec![message.into()],
        }
    }
}

/// Response from `GET /cities`.
#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub status: bool,
    pub cities: Vec<String>,
}

/// Response from the image listing routes.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub status: bool,
    pub images: Vec<ImageEntry>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Message returned for missing images and rejected paths alike.
pub const IMAGE_NOT_FOUND: &str = "Image not found.";

/// Message returned for unexpected server failures.
pub const INTERNAL_ERROR: &str = "Internal server error.";

/// Errors a handler can answer with.
#[derive(Debug)]
pub enum HandlerError {
    /// Catalog lookup failed
    Catalog(CatalogError),

    /// Path segments did not decode (for example invalid UTF-8)
    InvalidPath(PathRejection),
}

impl From<CatalogError> for HandlerError {
    fn from(err: CatalogError) -> Self {
        HandlerError::Catalog(err)
    }
}

impl From<PathRejection> for HandlerError {
    fn from(rejection: PathRejection) -> Self {
        HandlerError::InvalidPath(rejection)
    }
}

/// Convert handler errors to HTTP responses.
///
/// Traversal attempts and undecodable paths answer exactly like a missing
/// image; only the log level differs.
impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            HandlerError::Catalog(err @ CatalogError::ImageNotFound { .. }) => {
                debug!(status = 404, "Resource not found: {}", err);
                (StatusCode::NOT_FOUND, IMAGE_NOT_FOUND)
            }
            HandlerError::Catalog(err @ CatalogError::TraversalRejected { .. }) => {
                warn!(status = 404, "Client error: {}", err);
                (StatusCode::NOT_FOUND, IMAGE_NOT_FOUND)
            }
            HandlerError::Catalog(err @ CatalogError::Io(_)) => {
                error!(status = 500, "Server error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
            HandlerError::InvalidPath(rejection) => {
                debug!(status = 404, "Undecodable path: {}", rejection.body_text());
                (StatusCode::NOT_FOUND, IMAGE_NOT_FOUND)
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /{city}/{image}?password=<secret>`
///
/// # Response
///
/// - `200 OK`: image bytes streamed from disk
/// - `401 Unauthorized`: rejected by the query-token layer before this runs
/// - `404 Not Found`: no such image, or a path outside the catalog
///
/// # Headers
///
/// - `Content-Type: image/jpeg`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `Expires: now + cache_max_age`
pub async fn image_handler<C: CatalogResolver>(
    State(state): State<AppState<C>>,
    params: Result<Path<ImagePathParams>, PathRejection>,
) -> Result<Response, HandlerError> {
    let Path(params) = params?;
    let path = state
        .catalog
        .resolve_image(&params.city, &params.image)
        .await?;

    let not_found = |e: std::io::Error| {
        if e.kind() == ErrorKind::NotFound {
            CatalogError::ImageNotFound {
                city: params.city.clone(),
                image: params.image.clone(),
            }
        } else {
            CatalogError::Io(e)
        }
    };

    let file = tokio::fs::File::open(&path).await.map_err(not_found)?;
    let length = file.metadata().await.map_err(not_found)?.len();

    let max_age = state.cache_max_age;
    let expires = SystemTime::now() + Duration::from_secs(u64::from(max_age));

    debug!(
        city = %params.city,
        image = %params.image,
        bytes = length,
        "Serving image"
    );

    let headers = [
        (header::CONTENT_TYPE, "image/jpeg".to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
        (header::CACHE_CONTROL, format!("public, max-age={}", max_age)),
        (header::EXPIRES, httpdate::fmt_http_date(expires)),
    ];
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((StatusCode::OK, headers, body).into_response())
}

/// Handle city list requests.
///
/// # Endpoint
///
/// `GET /cities`
///
/// # Response
///
/// ```json
/// { "status": true, "cities": ["nyc", "la"] }
/// ```
pub async fn cities_handler<C: CatalogResolver>(
    State(state): State<AppState<C>>,
) -> Result<Json<CitiesResponse>, HandlerError> {
    let cities = state.catalog.list_all_cities().await?;
    Ok(Json(CitiesResponse {
        status: true,
        cities,
    }))
}

/// Handle requests for every image in the catalog.
///
/// # Endpoint
///
/// `POST /images`
///
/// # Response
///
/// ```json
/// {
///   "status": true,
///   "images": [
///     { "name": "a.jpg", "city": "nyc", "location": "https://host/nyc/a.jpg?password=..." }
///   ]
/// }
/// ```
///
/// File names are unique; the first city holding a name wins.
pub async fn all_images_handler<C: CatalogResolver>(
    State(state): State<AppState<C>>,
) -> Result<Json<ImagesResponse>, HandlerError> {
    let images = state.catalog.list_all_images().await?;
    Ok(Json(ImagesResponse {
        status: true,
        images,
    }))
}

/// Handle requests for one city's images.
///
/// # Endpoint
///
/// `POST /{city}`
///
/// An unknown city yields an empty list.
pub async fn city_images_handler<C: CatalogResolver>(
    State(state): State<AppState<C>>,
    params: Result<Path<CityPathParams>, PathRejection>,
) -> Result<Json<ImagesResponse>, HandlerError> {
    let Path(params) = params?;
    list_city_images(&state, &params.city).await
}

/// List one city's images. Shared by `/{city}` and static paths naming a city.
pub async fn list_city_images<C: CatalogResolver>(
    state: &AppState<C>,
    city: &str,
) -> Result<Json<ImagesResponse>, HandlerError> {
    let images = state.catalog.list_city(city).await?;
    Ok(Json(ImagesResponse {
        status: true,
        images,
    }))
}

/// Redirect a browser visiting `/{city}` to the frontend.
pub async fn city_redirect_handler<C: CatalogResolver>(
    State(state): State<AppState<C>>,
    params: Result<Path<CityPathParams>, PathRejection>,
) -> Result<Response, HandlerError> {
    let Path(params) = params?;
    Ok(city_redirect(&state, &params.city))
}

/// `302 Found` to the frontend with the city as a query parameter.
pub fn city_redirect<C: CatalogResolver>(state: &AppState<C>, city: &str) -> Response {
    let mut target = (*state.frontend_url).clone();
    target.query_pairs_mut().append_pair("city", city);
    found(target.as_str())
}

/// Redirect a browser visiting `/` to the frontend.
pub async fn root_redirect_handler<C: CatalogResolver>(
    State(state): State<AppState<C>>,
) -> Response {
    found(state.frontend_url.as_str())
}

/// JSON 404 for anything the route table does not match.
pub async fn fallback_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found."))).into_response()
}

/// `302 Found` with a `Location` header.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// =============================================================================
// Tests
// =============================================================================
