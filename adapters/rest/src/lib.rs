//! # svckit REST adapter
//!
//! Declarative route registration over [`axum`] plus the standard
//! middleware pair: request-id propagation and structured
//! request/response logging.
//!
//! ```rust,no_run
//! use axum::Router;
//! use svckit_rest::{with_middleware, register, Endpoint, HandlerMap};
//!
//! async fn status() -> &'static str {
//!     "ok"
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoints = vec![Endpoint::new("Orders.Status", "/status", &["GET"])];
//!     let mut handlers = HandlerMap::new();
//!     handlers.insert("Status", status);
//!
//!     let router = with_middleware(register(Router::new(), &endpoints, handlers)?);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod middleware;

mod routes;

pub use routes::{register, Endpoint, HandlerMap, RegisterError};

use axum::middleware::from_fn;
use axum::Router;
use tower_http::cors::CorsLayer;

/// Wrap `router` with the standard middleware stack.
///
/// Layer order matters: request-id runs before logging so the log line
/// carries the id that handlers and the response header see. CORS sits
/// outermost and answers preflights before they reach the log.
pub fn with_middleware(router: Router) -> Router {
    router
        .layer(from_fn(middleware::logging))
        .layer(from_fn(middleware::request_id))
        .layer(CorsLayer::permissive())
}
