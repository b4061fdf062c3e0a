//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use storeline_core::{CurrencyCode, OrderId, OrderStatus, ProductId, UserId};

/// A placed order. Items and address are fixed at creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, copied from the cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Where an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub line1: String,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub city: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20, message = "is required"))]
    pub postal_code: String,
    #[validate(length(equal = 2, message = "must be a two-letter country code"))]
    pub country: String,
}

/// Fields needed to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub currency: CurrencyCode,
}
