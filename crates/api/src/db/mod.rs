//! Data access for the API's `PostgreSQL` database.
//!
//! # Tables
//!
//! - `users` - Customer accounts (argon2 password hashes)
//! - `products` - Catalog
//! - `carts` / `cart_items` - One cart per user, items keyed by product
//! - `orders` / `order_items` - Placed orders with their line snapshot
//! - `payments` - Local mirror of provider payment intents
//! - `notifications` - Dispatched messages and their delivery status
//!
//! Each table has a repository trait (the seam services depend on) and a
//! `Pg*` implementation. In-memory implementations live in [`memory`] behind
//! the `test-support` feature.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storeline-cli -- migrate
//! ```

pub mod carts;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::{CartRepository, PgCartRepository};
pub use notifications::{NotificationRepository, PgNotificationRepository};
pub use orders::{OrderRepository, PgOrderRepository};
pub use payments::{PaymentRepository, PgPaymentRepository};
pub use products::{PgProductRepository, ProductRepository};
pub use users::{PgUserRepository, UserRepository};

/// Deadline applied to every repository call made by a service.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The call did not finish within [`QUERY_TIMEOUT`].
    #[error("query timed out")]
    Timeout,
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Parse a stored text column, reporting bad values as corruption.
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Convert a stored integer quantity to `u32`.
pub(crate) fn quantity_from_db(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity: {value}")))
}

/// Convert a quantity for storage.
pub(crate) fn quantity_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity too large: {value}")))
}

/// Convert a `COUNT(*)` result.
pub(crate) fn count_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Run a repository call under [`QUERY_TIMEOUT`].
///
/// # Errors
///
/// Returns the call's own error, or [`RepositoryError::Timeout`] when the
/// deadline passes first.
pub async fn with_timeout<T, F>(fut: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    with_deadline(QUERY_TIMEOUT, fut).await
}

async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .unwrap_or(Err(RepositoryError::Timeout))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let ok = with_timeout(async { Ok::<_, RepositoryError>(7) }).await;
        assert!(matches!(ok, Ok(7)));

        let err = with_timeout(async { Err::<(), _>(RepositoryError::NotFound) }).await;
        assert!(matches!(err, Err(RepositoryError::NotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_maps_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, RepositoryError>(())
        };
        let result = with_deadline(QUERY_TIMEOUT, slow).await;
        assert!(matches!(result, Err(RepositoryError::Timeout)));
    }

    #[test]
    fn test_column_helpers() {
        assert!(matches!(
            parse_column::<storeline_core::OrderStatus>("lost", "status"),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(quantity_from_db(-1).is_err());
        assert_eq!(count_from_db(-5), 0);
    }
}
