//! Notification repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storeline_core::{Email, NotificationId, NotificationStatus, UserId};

use super::{RepositoryError, count_from_db, parse_column};
use crate::models::{NewNotification, Notification};
use crate::pagination::Pagination;

/// Persistence for notifications and their delivery outcome.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a notification in the `pending` state.
    async fn create(&self, notification: NewNotification)
    -> Result<Notification, RepositoryError>;

    async fn get(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError>;

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Notification>, u64), RepositoryError>;

    /// Record the delivery outcome; `reason` is kept only for failures.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification does not exist.
    async fn set_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
        reason: Option<String>,
    ) -> Result<Notification, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    recipient: String,
    kind: String,
    subject: String,
    body: String,
    status: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let recipient = Email::parse(&row.recipient).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid recipient in database: {e}"))
        })?;

        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            recipient,
            kind: parse_column(&row.kind, "notification kind")?,
            subject: row.subject,
            body: row.body,
            status: parse_column(&row.status, "notification status")?,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, recipient, kind, subject, body, status, \
                                    failure_reason, created_at, updated_at";

/// `PostgreSQL` implementation of [`NotificationRepository`].
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let sql = format!(
            "INSERT INTO notifications (id, user_id, recipient, kind, subject, body, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(NotificationId::new())
            .bind(notification.user_id)
            .bind(&notification.recipient)
            .bind(notification.kind.as_str())
            .bind(&notification.subject)
            .bind(&notification.body)
            .bind(NotificationStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn get(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Notification::try_from)
            .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        page: Pagination,
    ) -> Result<(Vec<Notification>, u64), RepositoryError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let notifications = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((notifications, count_from_db(total)))
    }

    async fn set_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
        reason: Option<String>,
    ) -> Result<Notification, RepositoryError> {
        let sql = format!(
            "UPDATE notifications
             SET status = $2, failure_reason = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }
}
