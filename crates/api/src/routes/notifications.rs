//! Notification route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use storeline_core::{Email, NotificationId, NotificationKind};

use super::parse_id;
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::RequireAuth;
use crate::pagination::Pagination;
use crate::response::success;
use crate::services::NotificationRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub recipient: String,
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, max = 100_000, message = "must be 1 to 100000 characters"))]
    pub body: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ValidatedJson(req): ValidatedJson<SendNotificationRequest>,
) -> Result<Response> {
    let recipient = Email::parse(&req.recipient).map_err(|e| {
        AppError::validation("invalid request").with_detail(format!("recipient: {e}"))
    })?;

    let notification = state
        .notifications()
        .send(
            claims.user_id(),
            NotificationRequest {
                recipient,
                kind: req.kind,
                subject: req.subject,
                body: req.body,
            },
        )
        .await?;
    Ok(success(StatusCode::CREATED, notification))
}

#[instrument(skip(state, claims))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    pagination: Pagination,
) -> Result<Response> {
    let page = state
        .notifications()
        .list(claims.user_id(), pagination)
        .await?;
    Ok(success(StatusCode::OK, page))
}

#[instrument(skip(state, claims))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id: NotificationId = parse_id(&id, "notification id")?;
    let notification = state.notifications().get(claims.user_id(), id).await?;
    Ok(success(StatusCode::OK, notification))
}
