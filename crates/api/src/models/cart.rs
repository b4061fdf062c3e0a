//! Shopping cart types.
//!
//! Line and cart totals are never stored; they are derived from quantity and
//! unit price every time a cart is serialized.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use storeline_core::{CartId, CurrencyCode, Money, MoneyError, ProductId, UserId};

/// Most units of one product a cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 1000;

/// A user's cart. Each user has at most one.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "CartView")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// Items ordered by when they were first added.
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Catalog price captured when the product was first added.
    pub unit_price: Decimal,
    pub currency: CurrencyCode,
}

impl CartItem {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] on overflow.
    pub fn total(&self) -> Result<Money, MoneyError> {
        Money::new(self.unit_price, self.currency).times(self.quantity)
    }
}

impl Cart {
    /// Sum of line totals, or `None` for an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for mixed currencies and
    /// [`MoneyError::OutOfRange`] on overflow.
    pub fn total(&self) -> Result<Option<Money>, MoneyError> {
        let mut items = self.items.iter();
        let Some(first) = items.next() else {
            return Ok(None);
        };
        items
            .try_fold(first.total()?, |acc, item| acc.checked_add(item.total()?))
            .map(Some)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView {
    id: CartId,
    user_id: UserId,
    items: Vec<CartItemView>,
    total: Decimal,
    currency: Option<CurrencyCode>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartItemView {
    product_id: ProductId,
    quantity: u32,
    unit_price: Decimal,
    currency: CurrencyCode,
    total: Decimal,
}

// The cart service rejects changes whose totals do not compute, so the
// fallbacks below only apply to rows written outside it.
impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let total = cart.total().ok().flatten();
        Self {
            id: cart.id,
            user_id: cart.user_id,
            items: cart
                .items
                .into_iter()
                .map(|item| CartItemView {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    currency: item.currency,
                    total: item.total().map_or(Decimal::ZERO, |m| m.amount),
                })
                .collect(),
            total: total.map_or(Decimal::ZERO, |m| m.amount),
            currency: total.map(|m| m.currency),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn item(price: &str, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(),
            quantity,
            unit_price: Decimal::from_str(price).unwrap(),
            currency: CurrencyCode::Usd,
        }
    }

    fn cart(items: Vec<CartItem>) -> Cart {
        let now = Utc::now();
        Cart {
            id: CartId::new(),
            user_id: UserId::new(),
            items,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_line_total_is_quantity_times_price() {
        assert_eq!(
            item("10.99", 2).total().unwrap().amount,
            Decimal::from_str("21.98").unwrap()
        );
    }

    #[test]
    fn test_cart_total() {
        let filled = cart(vec![item("10.99", 2), item("0.02", 1)]);
        assert_eq!(
            filled.total().unwrap().unwrap().amount,
            Decimal::from_str("22.00").unwrap()
        );
        assert!(cart(vec![]).total().unwrap().is_none());
    }

    #[test]
    fn test_cart_total_errors() {
        let mut euro = item("1.00", 1);
        euro.currency = CurrencyCode::Eur;
        assert!(matches!(
            cart(vec![item("1.00", 1), euro]).total(),
            Err(MoneyError::CurrencyMismatch { .. })
        ));

        let mut huge = item("1", 2);
        huge.unit_price = Decimal::MAX;
        assert_eq!(huge.total(), Err(MoneyError::OutOfRange));
        assert_eq!(cart(vec![huge]).total(), Err(MoneyError::OutOfRange));
    }

    #[test]
    fn test_serialized_totals() {
        let json = serde_json::to_value(cart(vec![item("10.99", 2)])).unwrap();
        assert_eq!(json["items"][0]["total"], "21.98");
        assert_eq!(json["items"][0]["unitPrice"], "10.99");
        assert_eq!(json["total"], "21.98");
        assert_eq!(json["currency"], "usd");
    }

    #[test]
    fn test_empty_cart_serializes_zero_total() {
        let json = serde_json::to_value(cart(vec![])).unwrap();
        assert_eq!(json["total"], "0");
        assert!(json["currency"].is_null());
    }
}
