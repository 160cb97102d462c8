//! TaskProducer - payload をシリアライズしてブローカーに publish する
//!
//! 成功は「ブローカーが受け付けた」ことだけを意味し、配送・実行は保証しません。

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{EnqueueError, TaskId, TaskPayload};
use crate::ports::Broker;

#[derive(Clone)]
pub struct TaskProducer {
    broker: Arc<dyn Broker>,
    timeout: Duration,
}

impl TaskProducer {
    pub fn new(broker: Arc<dyn Broker>, timeout: Duration) -> Self {
        Self { broker, timeout }
    }

    /// Publish `payload` under its discriminant.
    pub async fn enqueue(&self, payload: &TaskPayload) -> Result<TaskId, EnqueueError> {
        let task_type = payload.task_type();
        let body = payload
            .to_bytes()
            .map_err(|source| EnqueueError::Serialization {
                task_type: task_type.clone(),
                source,
            })?;

        let task_id = tokio::time::timeout(self.timeout, self.broker.publish(task_type.clone(), body))
            .await
            .map_err(|_| EnqueueError::Timeout(self.timeout))??;

        debug!(%task_id, %task_type, "task enqueued");
        Ok(task_id)
    }
}
