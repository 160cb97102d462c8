//! Task record: broker-side metadata + envelope.

use std::time::Instant;

use super::TaskState;
use crate::domain::TaskEnvelope;

/// All state transitions of an unsettled task happen on this record; the
/// ready/scheduled queues only hold task ids.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub envelope: TaskEnvelope,
    pub state: TaskState,

    /// Number of times this task has been leased (including the current one if Running).
    pub attempts: u32,

    pub max_attempts: u32,

    pub last_error: Option<String>,

    /// When to retry next (for RetryScheduled state).
    pub next_run_at: Option<Instant>,

    pub created_at: Instant,
    pub updated_at: Instant,
}

impl TaskRecord {
    pub fn new(envelope: TaskEnvelope, max_attempts: u32) -> Self {
        let now = Instant::now();
        Self {
            envelope,
            state: TaskState::Queued,
            attempts: 0,
            max_attempts,
            last_error: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start_attempt(&mut self) {
        self.state = TaskState::Running;
        self.attempts += 1;
        self.updated_at = Instant::now();
    }

    pub fn schedule_retry(&mut self, next_run_at: Instant, error: String) {
        self.state = TaskState::RetryScheduled;
        self.next_run_at = Some(next_run_at);
        self.last_error = Some(error);
        self.updated_at = Instant::now();
    }

    /// RetryScheduled -> Queued
    pub fn requeue(&mut self) {
        self.state = TaskState::Queued;
        self.next_run_at = None;
        self.updated_at = Instant::now();
    }
}

/// A task that exhausted its attempts or failed permanently.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub envelope: TaskEnvelope,
    pub attempts: u32,
    pub error: String,
}
