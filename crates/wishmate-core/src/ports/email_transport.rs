//! EmailTransport port - テンプレートメールの送信（SMTP 等）
//!
//! テンプレートのレンダリングと送信はこの trait の向こう側の責務です。

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unknown template {0:?}")]
    UnknownTemplate(String),

    #[error("rejected recipient {0:?}")]
    Rejected(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_template_email(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<(), TransportError>;
}
