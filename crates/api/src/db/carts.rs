//! Cart repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use storeline_core::{CartId, ProductId, UserId};

use super::{RepositoryError, conflict_on_unique, parse_column, quantity_from_db, quantity_to_db};
use crate::models::{Cart, CartItem};

/// Persistence for carts and their items.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Create an empty cart for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a cart.
    async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// The user's cart with its items, if any.
    async fn get_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Add an item, or increase its quantity if the product is already present.
    ///
    /// The stored unit price of an existing line is kept.
    async fn add_item(&self, cart_id: CartId, item: CartItem) -> Result<(), RepositoryError>;

    /// Replace the quantity of an existing line. Returns `false` if absent.
    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError>;

    /// Remove a line. Returns `false` if absent.
    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;

    /// Remove every line; the cart itself remains.
    async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    currency: String,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::from_uuid(row.product_id),
            quantity: quantity_from_db(row.quantity)?,
            unit_price: row.unit_price,
            currency: parse_column(&row.currency, "currency")?,
        })
    }
}

/// `PostgreSQL` implementation of [`CartRepository`].
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn touch(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at, updated_at
            ",
        )
        .bind(CartId::new())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "cart already exists"))?;

        Ok(Cart {
            id: CartId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            items: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, created_at, updated_at
            FROM carts
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT product_id, quantity, unit_price, currency
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY added_at, product_id
            ",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CartItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            id: CartId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn add_item(&self, cart_id: CartId, item: CartItem) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price, currency)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            ",
        )
        .bind(cart_id)
        .bind(item.product_id)
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.unit_price)
        .bind(item.currency.as_str())
        .execute(&self.pool)
        .await?;

        self.touch(cart_id).await
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity_to_db(quantity)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch(cart_id).await?;
        Ok(true)
    }

    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch(cart_id).await?;
        Ok(true)
    }

    async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        self.touch(cart_id).await
    }
}
