//! App layer: scanning, producing, dispatching and handling tasks.

pub mod builder;
pub mod dispatcher;
pub mod fanout;
pub mod handlers;
pub mod producer;
pub mod scanner;
pub mod worker;

pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::dispatcher::{Dispatcher, Settlement};
pub use self::fanout::{birthday_payloads, reminder_payloads};
pub use self::handlers::{EmailHandler, NotificationHandler};
pub use self::producer::TaskProducer;
pub use self::scanner::{IncompleteScan, PeriodicScanner, ScanError, ScanReport, ScannerConfig, ScannerHandle, start_delay};
pub use self::worker::WorkerGroup;
