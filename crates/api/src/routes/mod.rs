//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Liveness
//! GET    /health/ready                 - Readiness (database reachable)
//!
//! # Users
//! POST   /users/register               - Create account
//! POST   /users/login                  - Issue bearer token
//! GET    /users/profile                - Caller's account (auth)
//!
//! # Products
//! GET    /products                     - Catalog page
//! GET    /products/{id}                - Product detail
//! POST   /products                     - Create (auth)
//! PUT    /products/{id}                - Partial update (auth)
//! DELETE /products/{id}                - Delete (auth)
//!
//! # Carts (auth)
//! POST   /carts                        - Create empty cart
//! GET    /carts                        - Caller's cart with totals
//! POST   /carts/items                  - Add item (creates cart if needed)
//! PUT    /carts/items                  - Set item quantity
//! DELETE /carts/items/{productId}      - Remove item
//!
//! # Orders (auth)
//! POST   /orders                       - Checkout the cart
//! GET    /orders                       - Caller's orders
//! GET    /orders/{id}                  - Order detail (owner only)
//! PATCH  /orders/{id}/status           - Status transition (owner only)
//!
//! # Payments
//! POST   /payments                     - Create payment intent (auth)
//! GET    /payments                     - Caller's payments (auth)
//! GET    /payments/{id}                - Payment detail (auth, owner)
//! POST   /payments/{id}/confirm        - Confirm intent (auth, owner)
//! POST   /payments/{id}/refund         - Refund (auth, owner)
//! POST   /payments/webhook             - Stripe webhook (signature, no bearer)
//!
//! # Notifications (auth)
//! POST   /notifications                - Send
//! GET    /notifications                - Caller's notifications
//! GET    /notifications/{id}           - Detail (owner only)
//! ```
//!
//! Path parameters are taken as strings and parsed here so that malformed
//! ids are answered with the standard envelope.

pub mod carts;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the health routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::live))
        .route("/ready", get(health::ready))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/profile", get(users::profile))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(carts::show).post(carts::create))
        .route("/items", post(carts::add_item).put(carts::update_item))
        .route("/items/{product_id}", delete(carts::remove_item))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", patch(orders::update_status))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(payments::index).post(payments::create))
        .route("/webhook", post(payments::webhook))
        .route("/{id}", get(payments::show))
        .route("/{id}/confirm", post(payments::confirm))
        .route("/{id}/refund", post(payments::refund))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index).post(notifications::create))
        .route("/{id}", get(notifications::show))
}

/// Parse a path segment into a typed id.
pub(crate) fn parse_id<T: FromStr>(raw: &str, name: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("invalid {name}")).with_detail(raw.to_owned()))
}
