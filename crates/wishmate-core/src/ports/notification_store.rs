//! NotificationStore port - in-app 通知の保存先
//!
//! NotificationHandler が必要とするのは `create_notification` だけ。

use async_trait::async_trait;

use crate::domain::{
    CreateNotification, NotificationId, NotificationRecord, StoreError, UserId,
};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new `unread` notification.
    async fn create_notification(
        &self,
        body: CreateNotification,
    ) -> Result<NotificationRecord, StoreError>;

    async fn get_notification(
        &self,
        _id: NotificationId,
    ) -> Result<NotificationRecord, StoreError> {
        Err(StoreError::NotImplemented("get_notification"))
    }

    async fn list_user_notifications(
        &self,
        _user_id: UserId,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        Err(StoreError::NotImplemented("list_user_notifications"))
    }

    async fn mark_read(&self, _id: NotificationId) -> Result<NotificationRecord, StoreError> {
        Err(StoreError::NotImplemented("mark_read"))
    }

    async fn delete_notification(&self, _id: NotificationId) -> Result<(), StoreError> {
        Err(StoreError::NotImplemented("delete_notification"))
    }
}
