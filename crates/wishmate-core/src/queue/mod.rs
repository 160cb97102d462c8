//! Queue module: broker-side state, retry policy, and the in-memory broker.
//!
//! The core never retries a handler inline. A failed delivery is reported to
//! the broker, which either schedules it again with backoff or moves it to the
//! dead-letter list.

mod memory;
mod record;
mod retry;
mod state;

pub use memory::InMemoryBroker;
pub use record::{DeadLetter, TaskRecord};
pub use retry::RetryPolicy;
pub use state::TaskState;
