//! Task trait - 型と discriminant（ルーティングキー）の対応付け
//!
//! # Trait Bounds
//! - `Serialize` / `DeserializeOwned`: ブローカーの wire format との相互変換
//! - `Send + Sync + 'static`: Arc に格納してワーカー間で共有するため

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::payload::{EMAIL_DELIVERY, NOTIFICATION_DELIVERY};
use crate::domain::{EmailDelivery, NotificationDelivery};

pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 命名規約: `{domain}:{action}`
    const TYPE: &'static str;
}

impl Task for EmailDelivery {
    const TYPE: &'static str = EMAIL_DELIVERY;
}

impl Task for NotificationDelivery {
    const TYPE: &'static str = NOTIFICATION_DELIVERY;
}
