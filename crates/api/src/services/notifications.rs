//! Outbound notifications with recorded delivery status.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use storeline_core::{Email, NotificationId, NotificationKind, NotificationStatus, UserId};

use super::ensure_owner;
use crate::db::{NotificationRepository, with_timeout};
use crate::email::{EmailSender, OutgoingEmail, html_to_text, sanitize_html};
use crate::error::{AppError, Result};
use crate::models::{NewNotification, Notification};
use crate::pagination::{Page, Pagination};

/// Validated input for [`NotificationService::send`].
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub recipient: Email,
    pub kind: NotificationKind,
    pub subject: String,
    /// HTML or plain text; sanitized before storage and delivery.
    pub body: String,
}

/// Notification operations.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Store and deliver a message. A delivery failure is recorded on the
    /// notification and returned as `THIRD_PARTY_ERROR`.
    async fn send(&self, user_id: UserId, request: NotificationRequest) -> Result<Notification>;

    async fn list(&self, user_id: UserId, page: Pagination) -> Result<Page<Notification>>;

    async fn get(&self, user_id: UserId, id: NotificationId) -> Result<Notification>;
}

/// [`NotificationService`] delivering through an [`EmailSender`].
pub struct NotificationServiceImpl {
    notifications: Arc<dyn NotificationRepository>,
    mailer: Arc<dyn EmailSender>,
}

impl NotificationServiceImpl {
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationRepository>, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            notifications,
            mailer,
        }
    }
}

#[async_trait]
impl NotificationService for NotificationServiceImpl {
    #[instrument(skip(self, request), fields(recipient = %request.recipient))]
    async fn send(&self, user_id: UserId, request: NotificationRequest) -> Result<Notification> {
        let body = sanitize_html(&request.body);

        let notification = with_timeout(self.notifications.create(NewNotification {
            user_id,
            recipient: request.recipient,
            kind: request.kind,
            subject: request.subject,
            body: body.clone(),
        }))
        .await?;

        let email = OutgoingEmail {
            to: notification.recipient.as_str().to_owned(),
            subject: notification.subject.clone(),
            text_body: html_to_text(&body),
            html_body: Some(body),
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                let sent = with_timeout(self.notifications.set_status(
                    notification.id,
                    NotificationStatus::Sent,
                    None,
                ))
                .await?;
                tracing::info!(notification_id = %sent.id, "Notification sent");
                Ok(sent)
            }
            Err(e) => {
                tracing::warn!(notification_id = %notification.id, error = %e, "Notification delivery failed");
                with_timeout(self.notifications.set_status(
                    notification.id,
                    NotificationStatus::Failed,
                    Some(e.to_string()),
                ))
                .await?;
                Err(AppError::from(e))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: UserId, page: Pagination) -> Result<Page<Notification>> {
        let (items, total) =
            with_timeout(self.notifications.list_for_user(user_id, page)).await?;
        Ok(Page::new(items, page, total))
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: UserId, id: NotificationId) -> Result<Notification> {
        let notification = with_timeout(self.notifications.get(id))
            .await?
            .ok_or_else(|| AppError::not_found("notification not found"))?;
        ensure_owner(notification.user_id, user_id, "notification")?;
        Ok(notification)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryNotificationRepository;
    use crate::email::FakeEmailSender;
    use crate::error::ErrorCode;

    fn request(body: &str) -> NotificationRequest {
        NotificationRequest {
            recipient: Email::parse("jane@example.com").unwrap(),
            kind: NotificationKind::Email,
            subject: "Your order".to_owned(),
            body: body.to_owned(),
        }
    }

    fn service(mailer: Arc<FakeEmailSender>) -> NotificationServiceImpl {
        NotificationServiceImpl::new(Arc::new(InMemoryNotificationRepository::default()), mailer)
    }

    #[tokio::test]
    async fn test_send_sanitizes_and_marks_sent() {
        let mailer = Arc::new(FakeEmailSender::new());
        let notifications = service(mailer.clone());
        let user = UserId::new();

        let sent = notifications
            .send(user, request("<p>Shipped!</p><script>alert(1)</script>"))
            .await
            .unwrap();
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert!(!sent.body.contains("script"));

        let delivered = mailer.sent();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].text_body, "Shipped!");
        assert_eq!(delivered[0].html_body.as_deref(), Some("<p>Shipped!</p>"));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_recorded() {
        let mailer = Arc::new(FakeEmailSender::new());
        mailer.fail_sends(true);
        let notifications = service(mailer);
        let user = UserId::new();

        let err = notifications.send(user, request("hi")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ThirdParty);

        let page = notifications.list(user, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, NotificationStatus::Failed);
        assert!(page.items[0].failure_reason.is_some());
    }

    #[tokio::test]
    async fn test_get_checks_owner() {
        let notifications = service(Arc::new(FakeEmailSender::new()));
        let owner = UserId::new();
        let sent = notifications.send(owner, request("hi")).await.unwrap();

        assert_eq!(notifications.get(owner, sent.id).await.unwrap().id, sent.id);
        let err = notifications.get(UserId::new(), sent.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
