//! Domain model: due-items, task payloads, identifiers and errors.

pub mod due_date;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod notification;
pub mod payload;
pub mod reminder;
pub mod task_type;

pub use self::due_date::{calculate_notify_date, next_occurrence, notify_date_for};
pub use self::envelope::TaskEnvelope;
pub use self::errors::{
    BrokerError, DispatchError, DueDateError, EnqueueError, ErrorKind, HandlerError, StoreError,
    ValidationError,
};
pub use self::ids::{NotificationId, ReminderId, TaskId, UserId};
pub use self::notification::{CreateNotification, NotificationRecord, NotificationStatus};
pub use self::payload::{
    EMAIL_DELIVERY, EmailDelivery, NOTIFICATION_DELIVERY, NotificationDelivery, TaskPayload,
};
pub use self::reminder::{BirthdayEvent, NewReminder, Reminder, ReminderStatus};
pub use self::task_type::TaskType;
