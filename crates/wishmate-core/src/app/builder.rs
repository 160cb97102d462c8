//! DispatcherBuilder - Dispatcher の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_tasks()` で処理しなければならない discriminant を宣言する
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェックし、不足があれば起動しない
//! - producer が出すのに consumer が受けない task_type を、実行時ではなく起動時に見つける

use super::dispatcher::Dispatcher;
use crate::typed::{Handler, RegistryError, Task, TypedRegistry};

/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .register::<NotificationDelivery, _>(NotificationHandler::new(store, timeout))?
///     .register::<EmailDelivery, _>(EmailHandler::new(transport, timeout))?
///     .expect_tasks(&TaskPayload::ALL_TYPES)
///     .build()?;
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: TypedRegistry,
    expected_tasks: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks are produced but have no handler.")]
    MissingTaskTypes(Vec<String>),
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(expected) = &self.expected_tasks {
            let registered = self.registry.registered_types();
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !registered.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing));
            }
        }
        Ok(Dispatcher::new(self.registry))
    }
}
