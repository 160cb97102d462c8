//! wishmate-core
//!
//! リマインダー・誕生日のスキャンと、非同期タスク配送の中核部分。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, reminder, notification, payload, due_date, errors）
//! - **ports**: 外部とのインターフェース（ReminderStore, NotificationStore, EmailTransport, Broker, Clock）
//! - **queue**: in-memory ブローカー（retry / backoff / dead-letter）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TypedRegistry, PayloadCodec）
//! - **app**: スキャナ、producer、dispatcher、worker、handler
//! - **impls**: ports の in-memory 実装（開発・テスト用）
//! - **config**: 環境変数からの設定
//!
//! # データの流れ
//! ```text
//! PeriodicScanner tick
//!   -> ReminderStore::get_due_reminders / get_due_birthdays
//!   -> TaskProducer::enqueue (notification, email)  -> Broker
//!   -> ReminderStore::mark_dispatched
//! WorkerGroup -> Broker::lease -> Dispatcher -> NotificationHandler / EmailHandler
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod typed;
