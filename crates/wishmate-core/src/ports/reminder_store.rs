//! ReminderStore port - リマインダーと誕生日の正本（DB）
//!
//! スキャナが使うのは `get_due_reminders` / `get_due_birthdays` / `mark_dispatched` の 3 つ。
//! CRUD 系は API ハンドラ用で、実装しないストアは `NotImplemented` を返します。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BirthdayEvent, NewReminder, Reminder, ReminderId, StoreError};

#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Reminders with `execute_at <= now AND status == pending`, in store order.
    async fn get_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError>;

    /// Users whose birth month/day equals `now`'s month/day.
    async fn get_due_birthdays(&self, now: DateTime<Utc>)
    -> Result<Vec<BirthdayEvent>, StoreError>;

    /// `pending -> dispatched`. Marking an already dispatched reminder is a no-op.
    async fn mark_dispatched(&self, id: ReminderId) -> Result<(), StoreError>;

    async fn create_reminder(&self, _input: NewReminder) -> Result<Reminder, StoreError> {
        Err(StoreError::NotImplemented("create_reminder"))
    }

    async fn delete_reminder(&self, _id: ReminderId) -> Result<(), StoreError> {
        Err(StoreError::NotImplemented("delete_reminder"))
    }
}
