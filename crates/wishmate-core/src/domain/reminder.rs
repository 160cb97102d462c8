//! Reminder and birthday due-items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ReminderId, UserId};

/// Dispatch state of a one-shot reminder.
///
/// Transitions only `Pending -> Dispatched`, and only the scanner performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Dispatched,
}

/// A one-shot scheduled notification request tied to `execute_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    /// Recipient address for the email task.
    pub email: String,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub execute_at: DateTime<Utc>,
    pub status: ReminderStatus,
}

impl Reminder {
    /// `execute_at <= now AND status == pending`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.execute_at <= now
    }
}

/// Input for creating a reminder. Validated by [`NewReminder::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReminder {
    pub user_id: UserId,
    pub email: String,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub execute_at: Option<DateTime<Utc>>,
}

impl NewReminder {
    /// Accepts only reminders the scanner can later turn into both tasks.
    pub fn validate(&self) -> Result<DateTime<Utc>, String> {
        if self.user_id.is_unset() {
            return Err("user id is required".to_string());
        }
        let required = [
            ("email", &self.email),
            ("title", &self.title),
            ("body", &self.body),
            ("kind", &self.kind),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        self.execute_at
            .ok_or_else(|| "execute_at is required".to_string())
    }
}

/// A user whose birthday is today.
///
/// Derived on every scan and never persisted, so there is no dispatched state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthdayEvent {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

impl BirthdayEvent {
    pub const TITLE: &'static str = "Happy Birthday!";
    pub const BODY: &'static str = "Wishing you a wonderful day filled with joy!";
    pub const KIND: &'static str = "birthday";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn reminder(execute_at: DateTime<Utc>, status: ReminderStatus) -> Reminder {
        Reminder {
            id: ReminderId::new(1),
            user_id: UserId::new(1),
            email: "a@example.com".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            kind: "alert".to_string(),
            execute_at,
            status,
        }
    }

    #[test]
    fn due_requires_pending_and_past_execute_at() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        assert!(reminder(now - Duration::minutes(1), ReminderStatus::Pending).is_due(now));
        assert!(reminder(now, ReminderStatus::Pending).is_due(now));
        assert!(!reminder(now + Duration::minutes(10), ReminderStatus::Pending).is_due(now));
        assert!(!reminder(now - Duration::minutes(1), ReminderStatus::Dispatched).is_due(now));
    }

    #[test]
    fn status_serializes_snake_case() {
        let s = serde_json::to_string(&ReminderStatus::Dispatched).unwrap();
        assert_eq!(s, "\"dispatched\"");
    }

    #[test]
    fn new_reminder_validation() {
        let mut input = NewReminder {
            user_id: UserId::new(3),
            email: "a@example.com".to_string(),
            title: "Buy gift".to_string(),
            body: "Bob wants a bike".to_string(),
            kind: "alert".to_string(),
            execute_at: None,
        };
        assert_eq!(input.validate().unwrap_err(), "execute_at is required");

        input.title = " ".to_string();
        assert_eq!(input.validate().unwrap_err(), "title is required");

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        input.title = "Buy gift".to_string();
        input.execute_at = Some(at);
        assert_eq!(input.validate().unwrap(), at);
    }

    #[rstest]
    #[case::no_email("email")]
    #[case::no_body("body")]
    #[case::no_kind("kind")]
    fn new_reminder_needs_every_payload_field(#[case] field: &str) {
        let mut input = NewReminder {
            user_id: UserId::new(3),
            email: "a@example.com".to_string(),
            title: "Buy gift".to_string(),
            body: "Bob wants a bike".to_string(),
            kind: "alert".to_string(),
            execute_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
        };
        match field {
            "email" => input.email = String::new(),
            "body" => input.body = "  ".to_string(),
            _ => input.kind = String::new(),
        }
        assert_eq!(input.validate().unwrap_err(), format!("{field} is required"));
    }
}
