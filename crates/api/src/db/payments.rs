//! Payment repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storeline_core::{OrderId, PaymentStatus, UserId};

use super::{RepositoryError, conflict_on_unique, count_from_db, parse_column};
use crate::models::{NewPayment, Payment};
use crate::pagination::Pagination;

/// Persistence for the local payment mirror.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;

    /// Look up by provider payment-intent id.
    async fn get(&self, id: &str) -> Result<Option<Payment>, RepositoryError>;

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Payment>, u64), RepositoryError>;

    /// Set the status. Returns `None` if the payment is unknown.
    async fn update_status(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: String,
    order_id: Uuid,
    user_id: Uuid,
    amount: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: OrderId::from_uuid(row.order_id),
            user_id: UserId::from_uuid(row.user_id),
            amount: row.amount,
            currency: parse_column(&row.currency, "currency")?,
            status: parse_column(&row.status, "payment status")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str =
    "id, order_id, user_id, amount, currency, status, created_at, updated_at";

/// `PostgreSQL` implementation of [`PaymentRepository`].
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let sql = format!(
            "INSERT INTO payments (id, order_id, user_id, amount, currency, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(&payment.id)
            .bind(payment.order_id)
            .bind(payment.user_id)
            .bind(payment.amount)
            .bind(payment.currency.as_str())
            .bind(payment.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "payment already recorded"))?
            .try_into()
    }

    async fn get(&self, id: &str) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Payment::try_from)
            .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Payment>, u64), RepositoryError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE user_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let payments = rows
            .into_iter()
            .map(Payment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((payments, count_from_db(total)))
    }

    async fn update_status(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!(
            "UPDATE payments SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Payment::try_from)
            .transpose()
    }
}
