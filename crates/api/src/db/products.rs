//! Product catalog repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use storeline_core::ProductId;

use super::{RepositoryError, count_from_db, parse_column};
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::pagination::Pagination;

/// Persistence for the catalog.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// One page of products, newest first, plus the total count.
    async fn list(&self, page: Pagination) -> Result<(Vec<Product>, u64), RepositoryError>;

    /// Apply a partial update. Returns `None` if the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Returns `false` if the product did not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    currency: String,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            currency: parse_column(&row.currency, "currency")?,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, currency, stock, created_at, updated_at";

/// `PostgreSQL` implementation of [`ProductRepository`].
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO products (id, name, description, price, currency, stock)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ProductId::new())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.currency.as_str())
            .bind(product.stock)
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<Product>, u64), RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((products, count_from_db(total)))
    }

    async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "UPDATE products SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 currency = COALESCE($5, currency),
                 stock = COALESCE($6, stock),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.description)
            .bind(update.price)
            .bind(update.currency.map(|c| c.as_str()))
            .bind(update.stock)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
