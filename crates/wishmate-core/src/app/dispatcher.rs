//! Dispatcher - lease したタスクを discriminant で handler に振り分ける
//!
//! 結果は必ずブローカーに返す（ack / fail）。リトライするかどうかはブローカーが
//! ErrorKind を見て決める。handler 自身は inline でリトライしない。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::domain::{BrokerError, DispatchError, TaskEnvelope};
use crate::ports::{Delivery, FailureOutcome};
use crate::typed::TypedRegistry;

/// How a delivery was settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    RetryScheduled { delay: Duration },
    DeadLettered,
}

impl From<FailureOutcome> for Settlement {
    fn from(outcome: FailureOutcome) -> Self {
        match outcome {
            FailureOutcome::RetryScheduled { delay } => Settlement::RetryScheduled { delay },
            FailureOutcome::DeadLettered => Settlement::DeadLettered,
        }
    }
}

pub struct Dispatcher {
    registry: Arc<TypedRegistry>,
}

impl Dispatcher {
    pub fn new(registry: TypedRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TypedRegistry {
        &self.registry
    }

    /// Route one envelope to its handler.
    pub async fn dispatch(&self, envelope: &TaskEnvelope) -> Result<(), DispatchError> {
        let task_type = envelope.task_type();
        let handler = self
            .registry
            .get(task_type.as_str())
            .ok_or_else(|| DispatchError::NoHandler(task_type.clone()))?;

        handler.handle_dyn(envelope.body()).await
    }

    /// Dispatch a leased task and report the result back to the broker.
    pub async fn process(&self, delivery: Box<dyn Delivery>) -> Result<Settlement, BrokerError> {
        let envelope = delivery.envelope().clone();
        let attempt = delivery.attempt();

        let err = match self.dispatch(&envelope).await {
            Ok(()) => {
                debug!(
                    task_id = %envelope.task_id(),
                    task_type = %envelope.task_type(),
                    attempt,
                    "task handled"
                );
                delivery.ack().await?;
                return Ok(Settlement::Acked);
            }
            Err(err) => err,
        };

        let kind = err.kind();
        let outcome = delivery.fail(err.to_string(), kind).await?;
        match outcome {
            FailureOutcome::RetryScheduled { delay } => warn!(
                task_id = %envelope.task_id(),
                task_type = %envelope.task_type(),
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %err,
                "task failed; retry scheduled"
            ),
            FailureOutcome::DeadLettered => error!(
                task_id = %envelope.task_id(),
                task_type = %envelope.task_type(),
                attempt,
                retryable = kind.is_retryable(),
                error = %err,
                "task failed; dead-lettered"
            ),
        }
        Ok(outcome.into())
    }
}
