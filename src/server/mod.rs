//! HTTP server layer for the city gallery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     GET /{city}/{image}  GET /cities  POST /images  POST /{city}│
//! │                                                                 │
//! │  ┌────────────┐  ┌─────────────┐  ┌───────────┐  ┌───────────┐  │
//! │  │ access_log │  │    auth     │  │  handlers │  │  routes   │  │
//! │  │  (audit)   │  │(query/basic)│  │ (requests)│  │  (table)  │  │
//! │  └────────────┘  └─────────────┘  └───────────┘  └───────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod access_log;
pub mod auth;
pub mod handlers;
pub mod routes;

pub use access_log::access_log_middleware;
pub use auth::{
    basic_auth_middleware, query_token_middleware, AuthError, AuthScheme, AuthState,
    SharedSecret, SignedUrlAuth,
};
pub use handlers::{
    all_images_handler, cities_handler, city_images_handler, city_redirect,
    city_redirect_handler, fallback_handler, image_handler, list_city_images,
    root_redirect_handler, AppState, CitiesResponse, ErrorResponse, HandlerError, ImagesResponse,
};
pub use routes::{create_router, RouteDef, RouteHandler, RouteMethod, RouterConfig, ROUTES};
