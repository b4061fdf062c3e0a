//! Notification types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storeline_core::{Email, NotificationId, NotificationKind, NotificationStatus, UserId};

/// A message dispatched on behalf of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub recipient: Email,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub subject: String,
    /// Sanitized body as sent.
    pub body: String,
    pub status: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a notification (always starts `pending`).
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub recipient: Email,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}
