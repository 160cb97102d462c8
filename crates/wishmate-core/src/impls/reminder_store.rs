//! InMemoryReminderStore - 開発・テスト用のリマインダーストア
//!
//! # 実装詳細
//! - reminders は挿入順の Vec（`get_due_reminders` はこの順で返す）
//! - 誕生日は UserProfile の birth_date から毎回導出し、状態は持たない
//! - Feb 29 生まれは平年だと Mar 1 に誕生日扱い（due_date と同じ方針）

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    BirthdayEvent, NewReminder, Reminder, ReminderId, ReminderStatus, StoreError, UserId,
    ValidationError, next_occurrence,
};
use crate::ports::ReminderStore;

/// The slice of a user record the birthday scan needs.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub birth_date: NaiveDate,
}

impl UserProfile {
    fn has_birthday_on(&self, today: NaiveDate) -> bool {
        next_occurrence(self.birth_date, today).is_ok_and(|next| next == today)
    }
}

#[derive(Default)]
struct StoreState {
    reminders: Vec<Reminder>,
    users: Vec<UserProfile>,
    last_id: i64,
}

#[derive(Default)]
pub struct InMemoryReminderStore {
    state: Mutex<StoreState>,
}

impl InMemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a reminder as-is (status included). Ids above the highest seeded
    /// one are handed out by `create_reminder`.
    pub async fn insert(&self, reminder: Reminder) {
        let mut state = self.state.lock().await;
        state.last_id = state.last_id.max(reminder.id.get());
        state.reminders.push(reminder);
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.state.lock().await.users.push(user);
    }

    pub async fn reminder(&self, id: ReminderId) -> Option<Reminder> {
        let state = self.state.lock().await;
        state.reminders.iter().find(|r| r.id == id).cloned()
    }

    pub async fn reminders(&self) -> Vec<Reminder> {
        self.state.lock().await.reminders.clone()
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn get_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .reminders
            .iter()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect())
    }

    async fn get_due_birthdays(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<BirthdayEvent>, StoreError> {
        let today = now.date_naive();
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .filter(|u| u.has_birthday_on(today))
            .map(|u| BirthdayEvent {
                user_id: u.user_id,
                email: u.email.clone(),
                name: u.name.clone(),
            })
            .collect())
    }

    async fn mark_dispatched(&self, id: ReminderId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let reminder = state
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("reminder {id}")))?;
        reminder.status = ReminderStatus::Dispatched;
        Ok(())
    }

    async fn create_reminder(&self, input: NewReminder) -> Result<Reminder, StoreError> {
        let execute_at = input.validate().map_err(ValidationError::new)?;

        let mut state = self.state.lock().await;
        state.last_id += 1;
        let reminder = Reminder {
            id: ReminderId::new(state.last_id),
            user_id: input.user_id,
            email: input.email,
            title: input.title,
            body: input.body,
            kind: input.kind,
            execute_at,
            status: ReminderStatus::Pending,
        };
        state.reminders.push(reminder.clone());
        Ok(reminder)
    }

    async fn delete_reminder(&self, id: ReminderId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let before = state.reminders.len();
        state.reminders.retain(|r| r.id != id);
        if state.reminders.len() == before {
            return Err(StoreError::NotFound(format!("reminder {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn reminder(id: i64, execute_at: DateTime<Utc>, status: ReminderStatus) -> Reminder {
        Reminder {
            id: ReminderId::new(id),
            user_id: UserId::new(1),
            email: "ada@example.com".to_string(),
            title: format!("reminder {id}"),
            body: "b".to_string(),
            kind: "alert".to_string(),
            execute_at,
            status,
        }
    }

    fn user(id: i64, birth_date: &str) -> UserProfile {
        UserProfile {
            user_id: UserId::new(id),
            email: format!("user{id}@example.com"),
            name: format!("user {id}"),
            birth_date: NaiveDate::parse_from_str(birth_date, "%Y-%m-%d").unwrap(),
        }
    }

    #[tokio::test]
    async fn due_reminders_exclude_future_and_dispatched() {
        let store = InMemoryReminderStore::new();
        store
            .insert(reminder(1, now() - Duration::minutes(1), ReminderStatus::Pending))
            .await;
        store
            .insert(reminder(2, now() + Duration::minutes(10), ReminderStatus::Pending))
            .await;
        store
            .insert(reminder(3, now() - Duration::minutes(1), ReminderStatus::Dispatched))
            .await;

        let due = store.get_due_reminders(now()).await.unwrap();
        let ids: Vec<i64> = due.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1]);

        store.mark_dispatched(ReminderId::new(1)).await.unwrap();
        assert!(store.get_due_reminders(now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_dispatched_unknown_is_not_found() {
        let store = InMemoryReminderStore::new();
        let err = store.mark_dispatched(ReminderId::new(9)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[rstest]
    #[case::same_month_day("1990-03-01", "2025-03-01", true)]
    #[case::other_day("1990-03-02", "2025-03-01", false)]
    #[case::leap_day_in_leap_year("2000-02-29", "2024-02-29", true)]
    #[case::leap_day_moves_to_march_first("2000-02-29", "2025-03-01", true)]
    #[case::leap_day_not_on_feb_28("2000-02-29", "2025-02-28", false)]
    #[case::march_first_in_leap_year_is_not_leap_day("2000-02-29", "2024-03-01", false)]
    #[tokio::test]
    async fn birthdays_match_month_and_day(
        #[case] birth: &str,
        #[case] today: &str,
        #[case] expected: bool,
    ) {
        let store = InMemoryReminderStore::new();
        store.add_user(user(5, birth)).await;

        let at = NaiveDate::parse_from_str(today, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
            .and_utc();
        let due = store.get_due_birthdays(at).await.unwrap();
        assert_eq!(!due.is_empty(), expected);
    }

    #[tokio::test]
    async fn create_validates_and_starts_pending() {
        let store = InMemoryReminderStore::new();
        store
            .insert(reminder(4, now(), ReminderStatus::Dispatched))
            .await;

        let created = store
            .create_reminder(NewReminder {
                user_id: UserId::new(2),
                email: "bob@example.com".to_string(),
                title: "Gift".to_string(),
                body: "Alice wants a scarf".to_string(),
                kind: "alert".to_string(),
                execute_at: Some(now()),
            })
            .await
            .unwrap();
        assert_eq!(created.id, ReminderId::new(5));
        assert_eq!(created.status, ReminderStatus::Pending);

        let err = store
            .create_reminder(NewReminder {
                user_id: UserId::new(2),
                email: "bob@example.com".to_string(),
                title: "  ".to_string(),
                body: String::new(),
                kind: "alert".to_string(),
                execute_at: Some(now()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_reminder_without_body() {
        let store = InMemoryReminderStore::new();
        let err = store
            .create_reminder(NewReminder {
                user_id: UserId::new(2),
                email: "bob@example.com".to_string(),
                title: "Gift".to_string(),
                body: String::new(),
                kind: "alert".to_string(),
                execute_at: Some(now()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.reminders().await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_once() {
        let store = InMemoryReminderStore::new();
        store
            .insert(reminder(1, now(), ReminderStatus::Pending))
            .await;

        store.delete_reminder(ReminderId::new(1)).await.unwrap();
        assert!(store.reminder(ReminderId::new(1)).await.is_none());
        assert!(matches!(
            store.delete_reminder(ReminderId::new(1)).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
