//! Health checks.

use axum::{extract::State, http::StatusCode, response::Response};

use crate::db::{RepositoryError, with_timeout};
use crate::error::{AppError, Result};
use crate::response::success;
use crate::state::AppState;

/// Liveness: the process is serving requests.
pub async fn live() -> Response {
    success(StatusCode::OK, "ok")
}

/// Readiness: the database answers a trivial query.
///
/// Without a pool (in-memory wiring) the service is always ready.
pub async fn ready(State(state): State<AppState>) -> Result<Response> {
    if let Some(pool) = state.pool() {
        with_timeout(async {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(RepositoryError::from)
        })
        .await
        .map_err(|e| AppError::resource_exhausted("database unavailable").with_source(e))?;
    }
    Ok(success(StatusCode::OK, "ready"))
}
