//! Cart route handlers. Every route acts on the caller's own cart.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use storeline_core::ProductId;

use super::parse_id;
use crate::error::Result;
use crate::extract::ValidatedJson;
use crate::middleware::RequireAuth;
use crate::response::success;
use crate::state::AppState;

/// Body of `POST /carts/items` and `PUT /carts/items`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: ProductId,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub quantity: u32,
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Response> {
    let cart = state.carts().create(claims.user_id()).await?;
    Ok(success(StatusCode::CREATED, cart))
}

#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Response> {
    let cart = state.carts().get(claims.user_id()).await?;
    Ok(success(StatusCode::OK, cart))
}

#[instrument(skip_all)]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ValidatedJson(req): ValidatedJson<CartItemRequest>,
) -> Result<Response> {
    let cart = state
        .carts()
        .add_item(claims.user_id(), req.product_id, req.quantity)
        .await?;
    Ok(success(StatusCode::OK, cart))
}

#[instrument(skip_all)]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ValidatedJson(req): ValidatedJson<CartItemRequest>,
) -> Result<Response> {
    let cart = state
        .carts()
        .update_item(claims.user_id(), req.product_id, req.quantity)
        .await?;
    Ok(success(StatusCode::OK, cart))
}

#[instrument(skip_all, fields(product_id = %product_id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Response> {
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    let cart = state
        .carts()
        .remove_item(claims.user_id(), product_id)
        .await?;
    Ok(success(StatusCode::OK, cart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::extract::decode_and_validate;

    #[test]
    fn test_quantity_bounds() {
        let body = |q: i64| format!(r#"{{"productId":"{}","quantity":{q}}}"#, ProductId::new());

        assert!(decode_and_validate::<CartItemRequest>(body(1).as_bytes()).is_ok());
        assert!(decode_and_validate::<CartItemRequest>(body(1000).as_bytes()).is_ok());

        let err = decode_and_validate::<CartItemRequest>(body(1001).as_bytes()).err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::Validation));
        let err = decode_and_validate::<CartItemRequest>(body(0).as_bytes()).err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::Validation));
    }
}
