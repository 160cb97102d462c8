//! Errors - エラー型と分類
//!
//! ErrorKind は「誰がリトライするか」を決めるための運用分類です。
//! - Transient: 一時的なエラー。スキャナは次の tick、consumer はブローカーのリトライに任せる
//! - Permanent: 恒久的なエラー。リトライせず、dead-letter に送る

use std::time::Duration;

use thiserror::Error;

use super::task_type::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// A payload or request is missing a required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DueDateError {
    #[error("invalid anniversary date {0:?}: use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("lead days must not be negative, got {0}")]
    InvalidLead(i64),

    #[error("notify date is outside the supported calendar range")]
    OutOfRange,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store operation not implemented: {0}")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Unavailable(_) | StoreError::Timeout(_) => ErrorKind::Transient,
            StoreError::NotFound(_)
            | StoreError::NotImplemented(_)
            | StoreError::Validation(_) => ErrorKind::Permanent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("broker is closed")]
    Closed,

    #[error("unknown task: {0}")]
    UnknownTask(String),
}

/// Failure of `TaskProducer::enqueue`. Never fatal to the caller.
#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("payload serialization failed for {task_type}: {source}")]
    Serialization {
        task_type: TaskType,
        #[source]
        source: serde_json::Error,
    },

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] BrokerError),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
}

impl EnqueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnqueueError::Serialization { .. } => ErrorKind::Permanent,
            EnqueueError::BrokerUnavailable(_) | EnqueueError::Timeout(_) => ErrorKind::Transient,
        }
    }
}

/// Failure reported by a task handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The referenced entity (e.g. the user) no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// The downstream collaborator refused the task for good.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::Validation(_) | HandlerError::NotFound(_) | HandlerError::Rejected(_) => {
                ErrorKind::Permanent
            }
            HandlerError::Transient(_) => ErrorKind::Transient,
        }
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => HandlerError::NotFound(what),
            StoreError::Validation(v) => HandlerError::Validation(v),
            other => HandlerError::Transient(other.to_string()),
        }
    }
}

/// Failure while routing one task to its handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no handler registered for task_type={0}")]
    NoHandler(TaskType),

    #[error("cannot decode {task_type} payload: {source}")]
    Decode {
        task_type: TaskType,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::NoHandler(_) | DispatchError::Decode { .. } => ErrorKind::Permanent,
            DispatchError::Handler(e) => e.kind(),
        }
    }
}
