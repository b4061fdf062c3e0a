//! Account route handlers.

use axum::{extract::State, http::StatusCode, response::Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use storeline_core::Email;

use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::response::success;
use crate::services::Registration;
use crate::state::AppState;

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Validator accepts a few shapes the domain type rejects; report those the
/// same way as any other field violation.
fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| {
        AppError::validation("invalid request").with_detail(format!("email: {e}"))
    })
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Response> {
    let user = state
        .users()
        .register(Registration {
            email: parse_email(&req.email)?,
            password: req.password,
            name: req.name.trim().to_owned(),
        })
        .await?;
    Ok(success(StatusCode::CREATED, user))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response> {
    let outcome = state
        .users()
        .login(&parse_email(&req.email)?, &req.password)
        .await?;
    Ok(success(
        StatusCode::OK,
        LoginResponse {
            token: outcome.token.token,
            token_type: "Bearer",
            expires_at: outcome.token.expires_at,
            user: outcome.user,
        },
    ))
}

#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Response> {
    let user = state.users().profile(claims.user_id()).await?;
    Ok(success(StatusCode::OK, user))
}
