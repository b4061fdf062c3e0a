//! Order route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use storeline_core::{OrderId, OrderStatus};

use super::parse_id;
use crate::error::Result;
use crate::extract::ValidatedJson;
use crate::middleware::RequireAuth;
use crate::models::ShippingAddress;
use crate::pagination::Pagination;
use crate::response::success;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> Result<Response> {
    let order = state
        .orders()
        .place(claims.user_id(), req.shipping_address)
        .await?;
    Ok(success(StatusCode::CREATED, order))
}

#[instrument(skip(state, claims))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    pagination: Pagination,
) -> Result<Response> {
    let page = state.orders().list(claims.user_id(), pagination).await?;
    Ok(success(StatusCode::OK, page))
}

#[instrument(skip(state, claims))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id: OrderId = parse_id(&id, "order id")?;
    let order = state.orders().get(claims.user_id(), id).await?;
    Ok(success(StatusCode::OK, order))
}

#[instrument(skip(state, claims, req))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> Result<Response> {
    let id: OrderId = parse_id(&id, "order id")?;
    let order = state
        .orders()
        .update_status(claims.user_id(), id, req.status)
        .await?;
    Ok(success(StatusCode::OK, order))
}
