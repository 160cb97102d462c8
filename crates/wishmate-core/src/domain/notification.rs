//! In-app notification records, owned by the notification store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    /// The receiver.
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    /// e.g. `alert`, `update`, `birthday`
    pub kind: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

/// Body passed to `NotificationStore::create_notification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub kind: String,
}
