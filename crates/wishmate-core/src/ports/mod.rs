//! Ports - 抽象化レイヤー
//!
//! 外部システム（DB, メッセージブローカー, SMTP）へのインターフェースです。
//! コアはこれらの trait にだけ依存し、実装はコンストラクタで注入します。

pub mod broker;
pub mod clock;
pub mod email_transport;
pub mod id_generator;
pub mod notification_store;
pub mod reminder_store;

pub use self::broker::{Broker, Delivery, FailureOutcome, QueueCounts};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::email_transport::{EmailTransport, TransportError};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notification_store::NotificationStore;
pub use self::reminder_store::ReminderStore;
