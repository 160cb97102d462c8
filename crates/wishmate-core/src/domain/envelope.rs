//! TaskEnvelope - ブローカーが運ぶメッセージ
//!
//! payload は producer 側でシリアライズ済みの bytes のまま運び、
//! consumer 側で task_type に対応する型にデコードします。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use super::task_type::TaskType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: TaskId,
    task_type: TaskType,
    body: Vec<u8>,
    published_at: DateTime<Utc>,
}

impl TaskEnvelope {
    pub fn new(
        task_id: TaskId,
        task_type: TaskType,
        body: Vec<u8>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            task_type,
            body,
            published_at,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}
