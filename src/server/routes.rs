//! Router configuration for the gallery.
//!
//! Routes are declared as data in [`ROUTES`]: method, path pattern, the
//! credential check the route requires, and the handler it dispatches to.
//! [`create_router`] walks the table once to build the axum router.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                 - Redirect to the frontend (public)
//! GET  /cities           - List cities (basic auth)
//! POST /cities           - List the images of the city named "cities" (basic auth)
//! POST /images           - List all images, unique by name (basic auth)
//! GET  /images           - Redirect to the frontend for the city named "images" (public)
//! GET  /{city}/{image}   - Serve an image (query token)
//! POST /{city}           - List one city's images (basic auth)
//! GET  /{city}           - Redirect to the frontend for a city (public)
//! ```
//!
//! Static segments take priority over `{city}` for every method, so the
//! methods `/cities` and `/images` do not claim for themselves are routed
//! explicitly to the city handlers, with the segment as the city name.
//!
//! # Example
//!
//! ```ignore
//! use city_gallery::catalog::{AccessUrlBuilder, FsCatalog, ImageCatalog};
//! use city_gallery::audit::{AuditLog, SqliteAuditSink};
//! use city_gallery::server::routes::{create_router, RouterConfig};
//!
//! let catalog = ImageCatalog::new(
//!     FsCatalog::new("images"),
//!     AccessUrlBuilder::with_password("images.example.com", "secret"),
//! );
//! let audit = AuditLog::spawn(SqliteAuditSink::in_memory()?)?;
//! let router = create_router(catalog, audit, RouterConfig::new("secret"));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use super::access_log::access_log_middleware;
use super::auth::{
    basic_auth_middleware, query_token_middleware, AuthScheme, AuthState, SharedSecret,
    SignedUrlAuth,
};
use super::handlers::{
    all_images_handler, cities_handler, city_images_handler, city_redirect,
    city_redirect_handler, fallback_handler, image_handler, list_city_images,
    root_redirect_handler, AppState,
};
use crate::audit::AuditLog;
use crate::catalog::{CatalogResolver, ImageCatalog};
use crate::config::{DEFAULT_CACHE_MAX_AGE, DEFAULT_FRONTEND_URL};

// =============================================================================
// Route Table
// =============================================================================

/// HTTP methods used by the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    fn filter(self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
        }
    }
}

/// Handler a route dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteHandler {
    Image,
    Cities,
    AllImages,
    CityImages,
    CityRedirect,
    RootRedirect,
}

/// One row of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub method: RouteMethod,
    pub path: &'static str,
    pub auth: AuthScheme,
    pub handler: RouteHandler,
}

impl RouteDef {
    /// City named by a static one-segment path such as `/cities`.
    ///
    /// `None` for patterns that capture the city from the request.
    pub fn literal_city(&self) -> Option<&'static str> {
        let segment = self.path.strip_prefix('/')?;
        if segment.is_empty() || segment.contains(['/', '{']) {
            None
        } else {
            Some(segment)
        }
    }
}

/// Every route the server exposes.
pub const ROUTES: &[RouteDef] = &[
    RouteDef {
        method: RouteMethod::Get,
        path: "/",
        auth: AuthScheme::Public,
        handler: RouteHandler::RootRedirect,
    },
    RouteDef {
        method: RouteMethod::Get,
        path: "/cities",
        auth: AuthScheme::Basic,
        handler: RouteHandler::Cities,
    },
    RouteDef {
        method: RouteMethod::Post,
        path: "/cities",
        auth: AuthScheme::Basic,
        handler: RouteHandler::CityImages,
    },
    RouteDef {
        method: RouteMethod::Post,
        path: "/images",
        auth: AuthScheme::Basic,
        handler: RouteHandler::AllImages,
    },
    RouteDef {
        method: RouteMethod::Get,
        path: "/images",
        auth: AuthScheme::Public,
        handler: RouteHandler::CityRedirect,
    },
    RouteDef {
        method: RouteMethod::Get,
        path: "/{city}/{image}",
        auth: AuthScheme::QueryToken,
        handler: RouteHandler::Image,
    },
    RouteDef {
        method: RouteMethod::Post,
        path: "/{city}",
        auth: AuthScheme::Basic,
        handler: RouteHandler::CityImages,
    },
    RouteDef {
        method: RouteMethod::Get,
        path: "/{city}",
        auth: AuthScheme::Public,
        handler: RouteHandler::CityRedirect,
    },
];

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared secret checked by every protected route
    pub password: String,

    /// Whether image fetches also accept signed URLs
    pub signed_urls: bool,

    /// Allowed CORS origins (None = mirror the request origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for images, in seconds
    pub cache_max_age: u32,

    /// Redirect target for browser visits
    pub frontend_url: Url,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given shared secret.
    ///
    /// By default:
    /// - Only the plain password is accepted on image URLs
    /// - CORS mirrors the request origin and allows credentials
    /// - Cache max-age is one year
    /// - Redirects go to the public frontend
    /// - Tracing is enabled
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            signed_urls: false,
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            frontend_url: Url::parse(DEFAULT_FRONTEND_URL).expect("default frontend URL is valid"),
            enable_tracing: true,
        }
    }

    /// Accept signed URLs on image fetches.
    pub fn with_signed_urls(mut self, enabled: bool) -> Self {
        self.signed_urls = enabled;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Set the frontend redirect target.
    pub fn with_frontend_url(mut self, url: Url) -> Self {
        self.frontend_url = url;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Authentication state for the middleware layers.
    pub fn auth_state(&self) -> AuthState {
        let auth = AuthState::new(SharedSecret::new(&self.password));
        if self.signed_urls {
            auth.with_signer(SignedUrlAuth::new(&self.password))
        } else {
            auth
        }
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Layers, outermost first:
/// - Audit log (every request, before anything else)
/// - Request tracing (optional)
/// - CORS
/// - Per-route authentication from [`ROUTES`]
pub fn create_router<C>(catalog: ImageCatalog<C>, audit: AuditLog, config: RouterConfig) -> Router
where
    C: CatalogResolver + 'static,
{
    let app_state = AppState::new(catalog, config.cache_max_age, config.frontend_url.clone());
    let auth = config.auth_state();

    let mut router = Router::new();
    for route in ROUTES {
        router = router.route(route.path, endpoint::<C>(route, &auth));
    }

    let router = router
        .fallback(fallback_handler)
        .with_state(app_state)
        .layer(build_cors_layer(&config));

    let router = if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.layer(middleware::from_fn_with_state(audit, access_log_middleware))
}

/// Build the method router for one table row, wrapped in its auth layer.
fn endpoint<C>(route: &RouteDef, auth: &AuthState) -> MethodRouter<AppState<C>>
where
    C: CatalogResolver + 'static,
{
    let filter = route.method.filter();
    let method_router = match (route.handler, route.literal_city()) {
        (RouteHandler::Image, _) => on(filter, image_handler::<C>),
        (RouteHandler::Cities, _) => on(filter, cities_handler::<C>),
        (RouteHandler::AllImages, _) => on(filter, all_images_handler::<C>),
        (RouteHandler::CityImages, Some(city)) => on(
            filter,
            move |State(state): State<AppState<C>>| async move {
                list_city_images(&state, city).await
            },
        ),
        (RouteHandler::CityImages, None) => on(filter, city_images_handler::<C>),
        (RouteHandler::CityRedirect, Some(city)) => on(
            filter,
            move |State(state): State<AppState<C>>| async move { city_redirect(&state, city) },
        ),
        (RouteHandler::CityRedirect, None) => on(filter, city_redirect_handler::<C>),
        (RouteHandler::RootRedirect, _) => on(filter, root_redirect_handler::<C>),
    };

    match route.auth {
        AuthScheme::Public => method_router,
        AuthScheme::QueryToken => method_router.route_layer(middleware::from_fn_with_state(
            auth.clone(),
            query_token_middleware,
        )),
        AuthScheme::Basic => method_router.route_layer(middleware::from_fn_with_state(
            auth.clone(),
            basic_auth_middleware,
        )),
    }
}

/// Build the CORS layer based on configuration.
///
/// Credentialed requests are allowed, so the origin is mirrored or matched
/// against a list rather than answered with a wildcard.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(AllowOrigin::mirror_request()),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
