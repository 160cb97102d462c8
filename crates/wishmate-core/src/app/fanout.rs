//! Fan-out of a due item into its notification + email task payloads.

use std::collections::BTreeMap;

use crate::domain::{
    BirthdayEvent, EmailDelivery, NotificationDelivery, Reminder, TaskPayload, ValidationError,
};

pub const REMINDER_TEMPLATE: &str = "reminder_mail";
pub const REMINDER_SUBJECT: &str = "Wishlist Reminder";
pub const BIRTHDAY_TEMPLATE: &str = "birthday_mail";
pub const BIRTHDAY_SUBJECT: &str = "Birthday";

pub fn reminder_payloads(reminder: &Reminder) -> Result<[TaskPayload; 2], ValidationError> {
    let notification = NotificationDelivery::new(
        reminder.user_id,
        reminder.title.clone(),
        reminder.body.clone(),
        reminder.kind.clone(),
    )?;

    let vars = BTreeMap::from([
        ("title".to_string(), reminder.title.clone()),
        ("body".to_string(), reminder.body.clone()),
        ("kind".to_string(), reminder.kind.clone()),
    ]);
    let email = EmailDelivery::new(reminder.email.clone(), REMINDER_TEMPLATE, REMINDER_SUBJECT, vars)?;

    Ok([notification.into(), email.into()])
}

pub fn birthday_payloads(birthday: &BirthdayEvent) -> Result<[TaskPayload; 2], ValidationError> {
    let notification = NotificationDelivery::new(
        birthday.user_id,
        BirthdayEvent::TITLE,
        BirthdayEvent::BODY,
        BirthdayEvent::KIND,
    )?;

    let vars = BTreeMap::from([
        ("name".to_string(), birthday.name.clone()),
        ("title".to_string(), BirthdayEvent::TITLE.to_string()),
        ("body".to_string(), BirthdayEvent::BODY.to_string()),
    ]);
    let email = EmailDelivery::new(birthday.email.clone(), BIRTHDAY_TEMPLATE, BIRTHDAY_SUBJECT, vars)?;

    Ok([notification.into(), email.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReminderId, ReminderStatus, UserId};
    use chrono::Utc;

    fn reminder() -> Reminder {
        Reminder {
            id: ReminderId::new(1),
            user_id: UserId::new(7),
            email: "ada@example.com".to_string(),
            title: "Gift for Bob".to_string(),
            body: "Bob's wishlist has 3 items".to_string(),
            kind: "alert".to_string(),
            execute_at: Utc::now(),
            status: ReminderStatus::Pending,
        }
    }

    #[test]
    fn reminder_fans_out_to_notification_and_email() {
        let [notification, email] = reminder_payloads(&reminder()).unwrap();

        let TaskPayload::NotificationDelivery(n) = notification else {
            panic!("expected notification first");
        };
        assert_eq!(n.user_id, UserId::new(7));
        assert_eq!(n.body, "Bob's wishlist has 3 items");

        let TaskPayload::EmailDelivery(e) = email else {
            panic!("expected email second");
        };
        assert_eq!(e.to, "ada@example.com");
        assert_eq!(e.template, "reminder_mail");
        assert_eq!(e.subject, "Wishlist Reminder");
        assert_eq!(e.vars["title"], "Gift for Bob");
    }

    #[test]
    fn birthday_uses_birthday_copy() {
        let birthday = BirthdayEvent {
            user_id: UserId::new(3),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
        };
        let [notification, email] = birthday_payloads(&birthday).unwrap();

        let TaskPayload::NotificationDelivery(n) = notification else {
            panic!("expected notification");
        };
        assert_eq!(n.title, "Happy Birthday!");
        assert_eq!(n.kind, "birthday");

        let TaskPayload::EmailDelivery(e) = email else {
            panic!("expected email");
        };
        assert_eq!(e.template, "birthday_mail");
        assert_eq!(e.vars["name"], "Bob");
    }

    #[test]
    fn reminder_without_recipient_is_invalid() {
        let mut r = reminder();
        r.email = String::new();
        assert!(reminder_payloads(&r).is_err());
    }
}
