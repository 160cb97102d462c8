//! Handler trait - Task を処理する Handler の定義
//!
//! - `Handler<T>`: 型付きの表層。`Handler<EmailDelivery>` は EmailDelivery しか受け取れない
//! - `DynHandler`: object-safe な内部層。bytes を受け取り、自分の型にデコードしてから委譲する
//! - `TypedHandler<T, H>`: 上の 2 つをつなぐ type erasure

use std::marker::PhantomData;

use async_trait::async_trait;

use super::codec::PayloadCodec;
use super::task::Task;
use crate::domain::{DispatchError, HandlerError};

#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<(), HandlerError>;
}

#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, body: &[u8]) -> Result<(), DispatchError>;
    fn task_type(&self) -> &str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    codec: PayloadCodec,
    _marker: PhantomData<fn(T)>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            codec: PayloadCodec,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(&self, body: &[u8]) -> Result<(), DispatchError> {
        let task: T = self.codec.decode(body)?;
        self.handler.handle(task).await?;
        Ok(())
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}
