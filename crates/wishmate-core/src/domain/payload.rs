//! Task payloads: the closed set of work the scanner fans out.
//!
//! Every variant carries only serializable primitives. The routing key of a
//! payload is fixed by its variant, so producers cannot publish an untyped
//! or misspelled discriminant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::UserId;
use super::task_type::TaskType;

pub const EMAIL_DELIVERY: &str = "mail:deliver";
pub const NOTIFICATION_DELIVERY: &str = "notification:deliver";

/// Send one templated email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDelivery {
    pub to: String,
    pub template: String,
    pub subject: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl EmailDelivery {
    pub fn new(
        to: impl Into<String>,
        template: impl Into<String>,
        subject: impl Into<String>,
        vars: BTreeMap<String, String>,
    ) -> Result<Self, ValidationError> {
        let email = Self {
            to: to.into(),
            template: template.into(),
            subject: subject.into(),
            vars,
        };
        email.validate()?;
        Ok(email)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.to.trim().is_empty() {
            return Err(ValidationError::new("recipient is required"));
        }
        if self.template.trim().is_empty() {
            return Err(ValidationError::new("template is required"));
        }
        if self.subject.trim().is_empty() {
            return Err(ValidationError::new("subject is required"));
        }
        Ok(())
    }
}

/// Create one in-app notification for `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDelivery {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub kind: String,
}

impl NotificationDelivery {
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let notification = Self {
            user_id,
            title: title.into(),
            body: body.into(),
            kind: kind.into(),
        };
        notification.validate()?;
        Ok(notification)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.is_unset() {
            return Err(ValidationError::new("user id is required"));
        }
        if self.title.is_empty() {
            return Err(ValidationError::new("title is required"));
        }
        if self.body.is_empty() {
            return Err(ValidationError::new("body is required"));
        }
        if self.kind.is_empty() {
            return Err(ValidationError::new("kind is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    EmailDelivery(EmailDelivery),
    NotificationDelivery(NotificationDelivery),
}

impl TaskPayload {
    /// Every discriminant a consumer must be able to handle.
    pub const ALL_TYPES: [&'static str; 2] = [EMAIL_DELIVERY, NOTIFICATION_DELIVERY];

    pub fn discriminant(&self) -> &'static str {
        match self {
            TaskPayload::EmailDelivery(_) => EMAIL_DELIVERY,
            TaskPayload::NotificationDelivery(_) => NOTIFICATION_DELIVERY,
        }
    }

    pub fn task_type(&self) -> TaskType {
        TaskType::new(self.discriminant())
    }

    /// Encode the variant body (without the tag) into the broker's wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            TaskPayload::EmailDelivery(p) => serde_json::to_vec(p),
            TaskPayload::NotificationDelivery(p) => serde_json::to_vec(p),
        }
    }
}

impl From<EmailDelivery> for TaskPayload {
    fn from(p: EmailDelivery) -> Self {
        TaskPayload::EmailDelivery(p)
    }
}

impl From<NotificationDelivery> for TaskPayload {
    fn from(p: NotificationDelivery) -> Self {
        TaskPayload::NotificationDelivery(p)
    }
}
