//! LogTransport - 送信せずにログへ出すだけのメール transport
//!
//! 送った内容は `sent()` で取り出せるのでテストの検証にも使います。
//! テンプレート名を `with_templates` で絞ると、未知のテンプレートは
//! `UnknownTemplate` になります。

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::ports::{EmailTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub template: String,
    pub vars: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct LogTransport {
    templates: Option<BTreeSet<String>>,
    sent: Mutex<Vec<SentEmail>>,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: Some(templates.into_iter().map(Into::into).collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send_template_email(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<(), TransportError> {
        if let Some(templates) = &self.templates
            && !templates.contains(template)
        {
            return Err(TransportError::UnknownTemplate(template.to_string()));
        }

        info!(to, subject, template, "email sent");
        self.sent.lock().await.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            template: template.to_string(),
            vars: vars.clone(),
        });
        Ok(())
    }
}
