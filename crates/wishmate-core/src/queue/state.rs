//! Task state machine for the broker.

use serde::{Deserialize, Serialize};

/// State of a task the broker still holds.
///
/// State transitions:
/// - Queued -> Running -> (acked, record dropped)
/// - Queued -> Running -> RetryScheduled -> Queued (loop until max_attempts)
/// - Queued -> Running -> (dead-lettered, record dropped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Ready to run immediately.
    Queued,

    /// Leased by a consumer.
    Running,

    /// Waiting for retry (delayed due to backoff).
    RetryScheduled,
}
