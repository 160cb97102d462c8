//! Broker port - producer と consumer の間のメッセージキュー
//!
//! # 設計原則
//! - publish はルーティングキー（TaskType）と bytes だけを受け取る
//! - consumer は lease したタスクを必ず `ack` か `fail` で返す
//! - リトライ・バックオフ・dead-letter の判断はブローカー側の責務（handler は inline でリトライしない）

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BrokerError, ErrorKind, TaskEnvelope, TaskId, TaskType};

/// What the broker did with a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    RetryScheduled { delay: Duration },
    DeadLettered,
}

/// A leased task. The consumer owns the lease until it reports back.
#[async_trait]
pub trait Delivery: Send {
    fn envelope(&self) -> &TaskEnvelope;

    /// 1-indexed attempt number of this delivery.
    fn attempt(&self) -> u32;

    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;

    /// Report a failure. `Permanent` failures skip retries and go straight to
    /// the dead-letter path.
    async fn fail(
        self: Box<Self>,
        error: String,
        kind: ErrorKind,
    ) -> Result<FailureOutcome, BrokerError>;
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Durably queue `body` under `task_type`.
    async fn publish(&self, task_type: TaskType, body: Vec<u8>) -> Result<TaskId, BrokerError>;

    /// Wait for the next runnable task. `None` once the broker is closed.
    async fn lease(&self) -> Option<Box<dyn Delivery>>;

    async fn counts(&self) -> Result<QueueCounts, BrokerError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub retry_scheduled: usize,
    pub dead: usize,
}
