//! Storeline API library.
//!
//! JSON-over-HTTP commerce backend: accounts, catalog, carts, orders,
//! Stripe payments and email notifications. Exposed as a library so the
//! router can be driven in-process by tests.
//!
//! Every response is an envelope: `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code", "message", "details"}}`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

use axum::{Router, middleware::from_fn};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Build the application router.
///
/// Includes request logging and tower-http tracing. CORS and the Sentry
/// layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/health", routes::health_routes())
        .nest("/users", routes::user_routes())
        .nest("/products", routes::product_routes())
        .nest("/carts", routes::cart_routes())
        .nest("/orders", routes::order_routes())
        .nest("/payments", routes::payment_routes())
        .nest("/notifications", routes::notification_routes())
        .fallback(|| async { AppError::not_found("route not found") })
        .method_not_allowed_fallback(|| async { AppError::bad_request("method not allowed") })
        .layer(from_fn(middleware::request_log_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
