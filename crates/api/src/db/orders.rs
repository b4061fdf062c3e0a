//! Order repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use storeline_core::{OrderId, OrderStatus, ProductId, UserId};

use super::{RepositoryError, count_from_db, parse_column, quantity_from_db, quantity_to_db};
use crate::models::{NewOrder, Order, OrderItem, ShippingAddress};
use crate::pagination::Pagination;

/// Persistence for orders and their line items.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert an order and its items atomically.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// One page of a user's orders, newest first, plus their total count.
    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Order>, u64), RepositoryError>;

    /// Set the status. Returns `None` if the order does not exist.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    line1: String,
    line2: Option<String>,
    city: String,
    state: Option<String>,
    postal_code: String,
    country: String,
    total: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: OrderId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            shipping_address: ShippingAddress {
                line1: self.line1,
                line2: self.line2,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
                country: self.country,
            },
            items,
            total: self.total,
            currency: parse_column(&self.currency, "currency")?,
            status: parse_column(&self.status, "order status")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = quantity_from_db(row.quantity)?;
        Ok(Self {
            product_id: ProductId::from_uuid(row.product_id),
            quantity,
            unit_price: row.unit_price,
            total: row.unit_price * Decimal::from(quantity),
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, line1, line2, city, state, postal_code, country, \
                             total, currency, status, created_at, updated_at";

/// `PostgreSQL` implementation of [`OrderRepository`].
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load items for a set of orders, grouped by order id.
    async fn items_for(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let address = &order.shipping_address;

        let sql = format!(
            "INSERT INTO orders
                 (id, user_id, line1, line2, city, state, postal_code, country, total, currency, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(OrderId::new())
            .bind(order.user_id)
            .bind(&address.line1)
            .bind(&address.line2)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.postal_code)
            .bind(&address.country)
            .bind(order.total)
            .bind(order.currency.as_str())
            .bind(OrderStatus::Pending.as_str())
            .fetch_one(&mut *tx)
            .await?;

        for (position, item) in (0_i32..).zip(&order.items) {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, position, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(item.product_id)
            .bind(quantity_to_db(item.quantity)?)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        row.into_order(order.items)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Order>, u64), RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((self.hydrate(rows).await?, count_from_db(total)))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }
}
