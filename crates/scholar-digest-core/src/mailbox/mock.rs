//! In-memory mailbox for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use super::{Mailbox, MailboxError};
use crate::AlertMessage;

/// Serves a fixed list of messages, in order, ignoring the query.
#[derive(Default)]
pub struct MockMailbox {
    messages: Vec<AlertMessage>,
    list_error: Option<MailboxError>,
    queries: Mutex<Vec<(String, u32)>>,
}

impl MockMailbox {
    pub fn new(messages: Vec<AlertMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Make every listing fail with `err`.
    pub fn failing(err: MailboxError) -> Self {
        Self {
            list_error: Some(err),
            ..Self::default()
        }
    }

    /// `(query, max_results)` pairs passed to `list_message_ids()`.
    pub fn queries(&self) -> Vec<(String, u32)> {
        self.queries.lock().unwrap().clone()
    }
}

impl Mailbox for MockMailbox {
    fn list_message_ids<'a>(
        &'a self,
        query: &'a str,
        max_results: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, MailboxError>> + Send + 'a>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        Box::pin(async move {
            if let Some(err) = &self.list_error {
                return Err(err.clone());
            }
            Ok(self
                .messages
                .iter()
                .take(max_results as usize)
                .map(|m| m.id.clone())
                .collect())
        })
    }

    fn get_message<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AlertMessage, MailboxError>> + Send + 'a>> {
        Box::pin(async move {
            self.messages
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| MailboxError::Request(format!("HTTP 404 for message {id}")))
        })
    }
}
