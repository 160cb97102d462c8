//! InMemoryNotificationStore - 通知の保存先（開発・テスト用）

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    CreateNotification, NotificationId, NotificationRecord, NotificationStatus, StoreError, UserId,
};
use crate::ports::{Clock, NotificationStore, SystemClock};

#[derive(Default)]
struct StoreState {
    records: Vec<NotificationRecord>,
    last_id: i64,
}

pub struct InMemoryNotificationStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn not_found(id: NotificationId) -> StoreError {
        StoreError::NotFound(format!("notification {id}"))
    }
}

impl Default for InMemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create_notification(
        &self,
        body: CreateNotification,
    ) -> Result<NotificationRecord, StoreError> {
        let created_at = self.clock.now();
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let record = NotificationRecord {
            id: NotificationId::new(state.last_id),
            user_id: body.user_id,
            title: body.title,
            body: body.body,
            kind: body.kind,
            status: NotificationStatus::Unread,
            created_at,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn get_notification(&self, id: NotificationId) -> Result<NotificationRecord, StoreError> {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    /// Newest first.
    async fn list_user_notifications(
        &self,
        user_id: UserId,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<NotificationRecord, StoreError> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        record.status = NotificationStatus::Read;
        Ok(record.clone())
    }

    async fn delete_notification(&self, id: NotificationId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
