use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use scholar_digest_core::{AlertMessage, Mailbox, MailboxError, MessagePart};
use serde::Deserialize;

use crate::credentials::Credential;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail REST client bound to one access token.
pub struct GmailClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn new(client: reqwest::Client, credential: &Credential) -> Self {
        Self {
            client,
            access_token: credential.access_token().to_string(),
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root (trailing slash optional).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailboxError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| MailboxError::Request(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailboxError::Auth(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }
        if !status.is_success() {
            return Err(MailboxError::Request(format!("HTTP {} from {}", status.as_u16(), url)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| MailboxError::Request(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| MailboxError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: String,
    internal_date: Option<String>,
    payload: Option<WirePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default)]
    mime_type: String,
    body: Option<WireBody>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WireBody {
    data: Option<String>,
}

impl From<WirePart> for MessagePart {
    fn from(part: WirePart) -> Self {
        MessagePart {
            mime_type: part.mime_type,
            data: part.body.and_then(|b| b.data),
            parts: part.parts.into_iter().map(MessagePart::from).collect(),
        }
    }
}

impl WireMessage {
    fn into_alert(self) -> AlertMessage {
        // Gmail sends internalDate as a decimal string of epoch millis.
        let internal_date = self.internal_date.as_deref().and_then(|raw| {
            raw.parse::<i64>()
                .map_err(|e| tracing::warn!(id = %self.id, raw, error = %e, "bad internalDate"))
                .ok()
        });
        AlertMessage {
            id: self.id,
            internal_date,
            payload: self.payload.unwrap_or_default().into(),
        }
    }
}

impl Mailbox for GmailClient {
    fn list_message_ids<'a>(
        &'a self,
        query: &'a str,
        max_results: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, MailboxError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/messages", self.base_url);
            let max = max_results.to_string();
            let list: ListResponse = self
                .get_json(&url, &[("q", query), ("maxResults", max.as_str())])
                .await?;
            tracing::debug!(query, count = list.messages.len(), "listed messages");
            Ok(list.messages.into_iter().map(|m| m.id).collect())
        })
    }

    fn get_message<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AlertMessage, MailboxError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/messages/{}", self.base_url, id);
            let message: WireMessage = self.get_json(&url, &[("format", "full")]).await?;
            Ok(message.into_alert())
        })
    }
}
