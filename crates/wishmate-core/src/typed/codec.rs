//! PayloadCodec - wire bytes と Task の相互変換

use super::task::Task;
use crate::domain::{DispatchError, TaskType};

/// JSON codec shared by the producer and the consumer side.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    pub fn encode<T: Task>(&self, task: &T) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(task)
    }

    pub fn decode<T: Task>(&self, body: &[u8]) -> Result<T, DispatchError> {
        serde_json::from_slice(body).map_err(|source| DispatchError::Decode {
            task_type: TaskType::new(T::TYPE),
            source,
        })
    }
}
