//! Payment route handlers and the Stripe webhook endpoint.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use storeline_core::{CurrencyCode, OrderId};

use crate::error::Result;
use crate::extract::{RawBody, ValidatedJson, decode_and_validate};
use crate::middleware::RequireAuth;
use crate::pagination::Pagination;
use crate::response::success;
use crate::state::AppState;
use crate::stripe::webhook::SIGNATURE_HEADER;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    pub currency: Option<CurrencyCode>,
}

/// Optional body of `POST /payments/{id}/confirm`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub payment_method: Option<String>,
}

#[instrument(skip(state, claims))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> Result<Response> {
    let created = state
        .payments()
        .create(claims.user_id(), req.order_id, req.currency)
        .await?;
    Ok(success(StatusCode::CREATED, created))
}

#[instrument(skip(state, claims))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    pagination: Pagination,
) -> Result<Response> {
    let page = state.payments().list(claims.user_id(), pagination).await?;
    Ok(success(StatusCode::OK, page))
}

#[instrument(skip(state, claims))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let payment = state.payments().get(claims.user_id(), &id).await?;
    Ok(success(StatusCode::OK, payment))
}

/// Confirm an intent. The body is optional; an empty body confirms with the
/// payment method already attached to the intent.
#[instrument(skip(state, claims, body))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
    RawBody(body): RawBody,
) -> Result<Response> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        ConfirmPaymentRequest::default()
    } else {
        decode_and_validate::<ConfirmPaymentRequest>(&body)?
    };

    let payment = state
        .payments()
        .confirm(claims.user_id(), &id, req.payment_method.as_deref())
        .await?;
    Ok(success(StatusCode::OK, payment))
}

#[instrument(skip(state, claims))]
pub async fn refund(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let payment = state.payments().refund(claims.user_id(), &id).await?;
    Ok(success(StatusCode::OK, payment))
}

/// Stripe webhook. Authenticated by signature, not by bearer token; the raw
/// body is verified before it is decoded.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> Result<Response> {
    // A header that is not valid UTF-8 cannot match any signature.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    let receipt = state.payments().handle_webhook(&body, signature).await?;
    Ok(success(StatusCode::OK, receipt))
}
