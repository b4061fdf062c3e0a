//! In-memory repositories for router-level tests.
//!
//! Each mirrors the constraints the `PostgreSQL` schema enforces (unique
//! emails, one cart per user, merged cart lines) so services behave the same
//! against either backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use storeline_core::{
    CartId, Email, NotificationId, NotificationStatus, OrderId, OrderStatus, PaymentStatus,
    ProductId, UserId,
};

use super::{
    CartRepository, NotificationRepository, OrderRepository, PaymentRepository,
    ProductRepository, RepositoryError, UserRepository,
};
use crate::models::{
    Cart, CartItem, NewNotification, NewOrder, NewPayment, NewProduct, NewUser, Notification,
    Order, Payment, Product, ProductUpdate, User,
};
use crate::pagination::Pagination;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Slice out one page of `items` (already sorted) and report the total.
fn paginate<T: Clone>(items: &[T], page: Pagination) -> (Vec<T>, u64) {
    let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(0);
    let slice = items.iter().skip(offset).take(limit).cloned().collect();
    (slice, total)
}

/// In-memory [`UserRepository`].
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = lock(&self.users);
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let now = Utc::now();
        let created = User {
            id: UserId::new(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.users).iter().find(|u| &u.email == email).cloned())
    }
}

/// In-memory [`ProductRepository`].
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: Mutex<Vec<Product>>,
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(),
            name: product.name,
            description: product.description,
            price: product.price,
            currency: product.currency,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        lock(&self.products).push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(lock(&self.products).iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<Product>, u64), RepositoryError> {
        let products = lock(&self.products);
        let newest_first: Vec<Product> = products.iter().rev().cloned().collect();
        Ok(paginate(&newest_first, page))
    }

    async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut products = lock(&self.products);
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        update.apply(product);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut products = lock(&self.products);
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }
}

/// In-memory [`CartRepository`].
#[derive(Debug, Default)]
pub struct InMemoryCartRepository {
    carts: Mutex<HashMap<UserId, Cart>>,
}

impl InMemoryCartRepository {
    fn with_cart<T>(
        &self,
        cart_id: CartId,
        f: impl FnOnce(&mut Cart) -> T,
    ) -> Result<T, RepositoryError> {
        let mut carts = lock(&self.carts);
        let cart = carts
            .values_mut()
            .find(|c| c.id == cart_id)
            .ok_or(RepositoryError::NotFound)?;
        let out = f(cart);
        cart.updated_at = Utc::now();
        Ok(out)
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut carts = lock(&self.carts);
        if carts.contains_key(&user_id) {
            return Err(RepositoryError::Conflict("cart already exists".to_owned()));
        }
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(),
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        carts.insert(user_id, cart.clone());
        Ok(cart)
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(lock(&self.carts).get(&user_id).cloned())
    }

    async fn add_item(&self, cart_id: CartId, item: CartItem) -> Result<(), RepositoryError> {
        self.with_cart(cart_id, |cart| {
            if let Some(existing) = cart
                .items
                .iter_mut()
                .find(|i| i.product_id == item.product_id)
            {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            } else {
                cart.items.push(item);
            }
        })
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        self.with_cart(cart_id, |cart| {
            cart.items
                .iter_mut()
                .find(|i| i.product_id == product_id)
                .map(|item| item.quantity = quantity)
                .is_some()
        })
    }

    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        self.with_cart(cart_id, |cart| {
            let before = cart.items.len();
            cart.items.retain(|i| i.product_id != product_id);
            cart.items.len() != before
        })
    }

    async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        self.with_cart(cart_id, |cart| cart.items.clear())
    }
}

/// In-memory [`OrderRepository`].
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let created = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            shipping_address: order.shipping_address,
            items: order.items,
            total: order.total,
            currency: order.currency,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        lock(&self.orders).push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(lock(&self.orders).iter().find(|o| o.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Order>, u64), RepositoryError> {
        let orders = lock(&self.orders);
        let mine: Vec<Order> = orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(&mine, page))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = lock(&self.orders);
        Ok(orders.iter_mut().find(|o| o.id == id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }
}

/// In-memory [`PaymentRepository`].
#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    payments: Mutex<Vec<Payment>>,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let mut payments = lock(&self.payments);
        if payments.iter().any(|p| p.id == payment.id) {
            return Err(RepositoryError::Conflict(
                "payment already recorded".to_owned(),
            ));
        }
        let now = Utc::now();
        let created = Payment {
            id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            created_at: now,
            updated_at: now,
        };
        payments.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<Option<Payment>, RepositoryError> {
        Ok(lock(&self.payments).iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Payment>, u64), RepositoryError> {
        let payments = lock(&self.payments);
        let mine: Vec<Payment> = payments
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(&mine, page))
    }

    async fn update_status(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError> {
        let mut payments = lock(&self.payments);
        Ok(payments.iter_mut().find(|p| p.id == id).map(|payment| {
            payment.status = status;
            payment.updated_at = Utc::now();
            payment.clone()
        }))
    }
}

/// In-memory [`NotificationRepository`].
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    notifications: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let now = Utc::now();
        let created = Notification {
            id: NotificationId::new(),
            user_id: notification.user_id,
            recipient: notification.recipient,
            kind: notification.kind,
            subject: notification.subject,
            body: notification.body,
            status: NotificationStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.notifications).push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(lock(&self.notifications)
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Notification>, u64), RepositoryError> {
        let notifications = lock(&self.notifications);
        let mine: Vec<Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(&mine, page))
    }

    async fn set_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
        reason: Option<String>,
    ) -> Result<Notification, RepositoryError> {
        let mut notifications = lock(&self.notifications);
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepositoryError::NotFound)?;
        notification.status = status;
        notification.failure_reason = reason;
        notification.updated_at = Utc::now();
        Ok(notification.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use storeline_core::CurrencyCode;

    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::default();
        let new_user = NewUser {
            email: Email::parse("dup@example.com").unwrap(),
            name: "Dup".to_owned(),
            password_hash: "hash".to_owned(),
        };
        repo.create(new_user.clone()).await.unwrap();
        assert!(matches!(
            repo.create(new_user).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_cart_add_merges_lines() {
        let repo = InMemoryCartRepository::default();
        let user = UserId::new();
        let cart = repo.create(user).await.unwrap();
        let item = CartItem {
            product_id: ProductId::new(),
            quantity: 2,
            unit_price: Decimal::new(1099, 2),
            currency: CurrencyCode::Usd,
        };
        repo.add_item(cart.id, item.clone()).await.unwrap();
        repo.add_item(cart.id, CartItem { quantity: 3, ..item.clone() })
            .await
            .unwrap();

        let cart = repo.get_by_user(user).await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert!(matches!(repo.create(user).await, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_paginate_bounds() {
        let items: Vec<u32> = (0..25).collect();
        let (page, total) = paginate(&items, Pagination::from_query("page=3&pageSize=10"));
        assert_eq!(page, vec![20, 21, 22, 23, 24]);
        assert_eq!(total, 25);
        let (page, _) = paginate(&items, Pagination::from_query("page=9"));
        assert!(page.is_empty());
    }
}
