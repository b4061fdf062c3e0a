//! Catalog route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use validator::{Validate, ValidationError};

use storeline_core::{CurrencyCode, ProductId, check_unit_price};

use super::parse_id;
use crate::error::Result;
use crate::extract::ValidatedJson;
use crate::middleware::RequireAuth;
use crate::models::{NewProduct, ProductUpdate};
use crate::pagination::Pagination;
use crate::response::success;
use crate::state::AppState;

fn valid_price(price: &Decimal) -> std::result::Result<(), ValidationError> {
    check_unit_price(*price)
        .map_err(|e| ValidationError::new("price").with_message(e.to_string().into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub name: String,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "valid_price"))]
    pub price: Decimal,
    pub currency: Option<CurrencyCode>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "valid_price"))]
    pub price: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i32>,
}

#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>, pagination: Pagination) -> Result<Response> {
    let page = state.products().list(pagination).await?;
    Ok(success(StatusCode::OK, page))
}

#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id: ProductId = parse_id(&id, "product id")?;
    let product = state.products().get(id).await?;
    Ok(success(StatusCode::OK, product))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> Result<Response> {
    let product = state
        .products()
        .create(NewProduct {
            name: req.name,
            description: req.description,
            price: req.price,
            currency: req.currency.unwrap_or_else(|| state.default_currency()),
            stock: req.stock,
        })
        .await?;
    Ok(success(StatusCode::CREATED, product))
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> Result<Response> {
    let id: ProductId = parse_id(&id, "product id")?;
    let product = state
        .products()
        .update(
            id,
            ProductUpdate {
                name: req.name,
                description: req.description,
                price: req.price,
                currency: req.currency,
                stock: req.stock,
            },
        )
        .await?;
    Ok(success(StatusCode::OK, product))
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id: ProductId = parse_id(&id, "product id")?;
    state.products().delete(id).await?;
    Ok(success(
        StatusCode::OK,
        serde_json::json!({ "deleted": true }),
    ))
}
