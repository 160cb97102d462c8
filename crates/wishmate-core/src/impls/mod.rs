//! Impls - ports の in-memory 実装（開発・テスト用）

pub mod log_transport;
pub mod notification_store;
pub mod reminder_store;

pub use self::log_transport::{LogTransport, SentEmail};
pub use self::notification_store::InMemoryNotificationStore;
pub use self::reminder_store::{InMemoryReminderStore, UserProfile};
