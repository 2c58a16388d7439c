//! Mailbox trait for fetching alert emails.

pub mod mock;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::AlertMessage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("mailbox request failed: {0}")]
    Request(String),
    #[error("malformed mailbox response: {0}")]
    Malformed(String),
}

/// A mailbox that can list messages matching a query and fetch them by id.
pub trait Mailbox: Send + Sync {
    /// Ids of at most `max_results` messages matching `query`, newest first.
    fn list_message_ids<'a>(
        &'a self,
        query: &'a str,
        max_results: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, MailboxError>> + Send + 'a>>;

    /// Fetch a full message, including its payload tree.
    fn get_message<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AlertMessage, MailboxError>> + Send + 'a>>;
}
