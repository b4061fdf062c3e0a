//! Payment types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storeline_core::{CurrencyCode, OrderId, PaymentStatus, UserId};

/// Local mirror of a provider payment intent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Provider payment-intent id (`pi_...`).
    pub id: String,
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Amount in minor units (cents).
    pub amount: i64,
    pub currency: CurrencyCode,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returned once, when the intent is created. The client secret is not stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayment {
    #[serde(flatten)]
    pub payment: Payment,
    pub client_secret: Option<String>,
}

/// Fields needed to insert a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: String,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub status: PaymentStatus,
}
