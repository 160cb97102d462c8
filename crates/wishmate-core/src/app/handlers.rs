//! Task-side handlers.
//!
//! Both validate first (a bad payload is permanent and goes to the dead-letter
//! list) and bound the downstream call with a timeout. Replays are not
//! deduplicated: a redelivered task is handled again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{
    CreateNotification, EmailDelivery, HandlerError, NotificationDelivery, StoreError,
};
use crate::ports::{EmailTransport, NotificationStore, TransportError};
use crate::typed::Handler;

pub struct NotificationHandler {
    store: Arc<dyn NotificationStore>,
    timeout: Duration,
}

impl NotificationHandler {
    pub fn new(store: Arc<dyn NotificationStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl Handler<NotificationDelivery> for NotificationHandler {
    async fn handle(&self, task: NotificationDelivery) -> Result<(), HandlerError> {
        task.validate()?;

        let body = CreateNotification {
            user_id: task.user_id,
            title: task.title,
            body: task.body,
            kind: task.kind,
        };
        let record = tokio::time::timeout(self.timeout, self.store.create_notification(body))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;

        debug!(notification_id = %record.id, user_id = %record.user_id, "notification created");
        Ok(())
    }
}

impl From<TransportError> for HandlerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(reason) => HandlerError::Transient(reason),
            rejected @ (TransportError::UnknownTemplate(_) | TransportError::Rejected(_)) => {
                HandlerError::Rejected(rejected.to_string())
            }
        }
    }
}

/// Failures are returned to the broker: an unreachable transport is retried
/// with backoff, a refused message is dead-lettered.
pub struct EmailHandler {
    transport: Arc<dyn EmailTransport>,
    timeout: Duration,
}

impl EmailHandler {
    pub fn new(transport: Arc<dyn EmailTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }
}

#[async_trait]
impl Handler<EmailDelivery> for EmailHandler {
    async fn handle(&self, task: EmailDelivery) -> Result<(), HandlerError> {
        task.validate()?;

        let send = self
            .transport
            .send_template_email(&task.to, &task.subject, &task.template, &task.vars);
        tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| HandlerError::Transient(format!("email send timed out after {:?}", self.timeout)))??;

        debug!(to = %task.to, template = %task.template, "email handed to transport");
        Ok(())
    }
}
