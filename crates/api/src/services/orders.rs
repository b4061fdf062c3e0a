//! Checkout and order lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use storeline_core::{OrderId, OrderStatus, UserId};

use super::ensure_owner;
use crate::db::{CartRepository, OrderRepository, with_timeout};
use crate::error::{AppError, Result};
use crate::models::{NewOrder, Order, OrderItem, ShippingAddress};
use crate::pagination::{Page, Pagination};

/// Order operations for the authenticated user.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Turn the caller's cart into a `pending` order and empty the cart.
    async fn place(&self, user_id: UserId, shipping_address: ShippingAddress) -> Result<Order>;

    /// The caller's orders, newest first.
    async fn list(&self, user_id: UserId, page: Pagination) -> Result<Page<Order>>;

    async fn get(&self, user_id: UserId, id: OrderId) -> Result<Order>;

    /// Move an order along its lifecycle; illegal transitions fail with 400.
    async fn update_status(
        &self,
        user_id: UserId,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order>;
}

/// [`OrderService`] over order and cart repositories.
pub struct OrderServiceImpl {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
}

impl OrderServiceImpl {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { orders, carts }
    }

    async fn owned(&self, user_id: UserId, id: OrderId) -> Result<Order> {
        let order = with_timeout(self.orders.get(id))
            .await?
            .ok_or_else(|| AppError::not_found("order not found"))?;
        ensure_owner(order.user_id, user_id, "order")?;
        Ok(order)
    }
}

#[async_trait]
impl OrderService for OrderServiceImpl {
    #[instrument(skip(self, shipping_address))]
    async fn place(&self, user_id: UserId, shipping_address: ShippingAddress) -> Result<Order> {
        let cart = with_timeout(self.carts.get_by_user(user_id))
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| AppError::bad_request("cart is empty"))?;

        let total = cart
            .total()?
            .ok_or_else(|| AppError::bad_request("cart is empty"))?;

        let items = cart
            .items
            .iter()
            .map(|item| -> Result<OrderItem> {
                Ok(OrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total: item.total()?.amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let order = with_timeout(self.orders.create(NewOrder {
            user_id,
            shipping_address,
            items,
            total: total.amount,
            currency: total.currency,
        }))
        .await?;

        // Order is stored; a failed clear only leaves a stale cart.
        if let Err(e) = with_timeout(self.carts.clear(cart.id)).await {
            tracing::warn!(cart_id = %cart.id, error = %e, "Failed to clear cart after checkout");
        }

        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: UserId, page: Pagination) -> Result<Page<Order>> {
        let (items, total) = with_timeout(self.orders.list_for_user(user_id, page)).await?;
        Ok(Page::new(items, page, total))
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: UserId, id: OrderId) -> Result<Order> {
        self.owned(user_id, id).await
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        user_id: UserId,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        let order = self.owned(user_id, id).await?;
        if !order.status.can_transition_to(status) {
            return Err(AppError::bad_request(format!(
                "cannot change order status from {} to {}",
                order.status.as_str(),
                status.as_str()
            )));
        }

        let updated = with_timeout(self.orders.update_status(id, status))
            .await?
            .ok_or_else(|| AppError::not_found("order not found"))?;
        tracing::info!(order_id = %id, status = status.as_str(), "Order status updated");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use storeline_core::{CurrencyCode, ProductId};

    use super::*;
    use crate::db::memory::{InMemoryCartRepository, InMemoryOrderRepository};
    use crate::error::ErrorCode;
    use crate::models::CartItem;

    struct Fixture {
        service: OrderServiceImpl,
        carts: Arc<InMemoryCartRepository>,
    }

    fn fixture() -> Fixture {
        let carts = Arc::new(InMemoryCartRepository::default());
        Fixture {
            service: OrderServiceImpl::new(
                Arc::new(InMemoryOrderRepository::default()),
                carts.clone(),
            ),
            carts,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            line1: "1 Main St".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            state: Some("IL".to_owned()),
            postal_code: "62701".to_owned(),
            country: "US".to_owned(),
        }
    }

    async fn fill_cart(carts: &InMemoryCartRepository, user: UserId) {
        let cart = carts.create(user).await.unwrap();
        carts
            .add_item(
                cart.id,
                CartItem {
                    product_id: ProductId::new(),
                    quantity: 2,
                    unit_price: Decimal::new(1099, 2),
                    currency: CurrencyCode::Usd,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_place_order_totals_and_clears_cart() {
        let f = fixture();
        let user = UserId::new();
        fill_cart(&f.carts, user).await;

        let order = f.service.place(user, address()).await.unwrap();
        assert_eq!(order.total, Decimal::new(2198, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].total, Decimal::new(2198, 2));

        let cart = f.carts.get_by_user(user).await.unwrap().unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_place_with_empty_or_missing_cart() {
        let f = fixture();
        let user = UserId::new();
        let err = f.service.place(user, address()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);

        f.carts.create(user).await.unwrap();
        let err = f.service.place(user, address()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_other_users_order_is_forbidden() {
        let f = fixture();
        let owner = UserId::new();
        fill_cart(&f.carts, owner).await;
        let order = f.service.place(owner, address()).await.unwrap();

        let err = f.service.get(UserId::new(), order.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        let err = f.service.get(owner, OrderId::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let f = fixture();
        let user = UserId::new();
        fill_cart(&f.carts, user).await;
        let order = f.service.place(user, address()).await.unwrap();

        let shipping = f
            .service
            .update_status(user, order.id, OrderStatus::Shipping)
            .await
            .unwrap();
        assert_eq!(shipping.status, OrderStatus::Shipping);

        let err = f
            .service
            .update_status(user, order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_list_is_per_user() {
        let f = fixture();
        let user = UserId::new();
        fill_cart(&f.carts, user).await;
        f.service.place(user, address()).await.unwrap();

        assert_eq!(f.service.list(user, Pagination::default()).await.unwrap().total, 1);
        assert_eq!(
            f.service
                .list(UserId::new(), Pagination::default())
                .await
                .unwrap()
                .total,
            0
        );
    }
}
