//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use storeline_core::{CurrencyCode, Money, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in the currency's standard unit.
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price with its currency.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        Money::new(self.price, self.currency)
    }
}

/// Fields needed to insert a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub stock: i32,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub stock: Option<i32>,
}

impl ProductUpdate {
    /// Apply this update to `product` in place.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = Some(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(currency) = self.currency {
            product.currency = currency;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}
