//! Gmail access for scholar alert digests.
//!
//! [`Credential`] owns the OAuth token lifecycle (load, refresh, interactive
//! consent, persist). [`GmailClient`] uses the resulting access token to
//! implement the core [`Mailbox`](scholar_digest_core::Mailbox) trait.

mod client;
mod credentials;
mod flow;

use std::path::PathBuf;

use thiserror::Error;

pub use client::{GMAIL_API_BASE, GmailClient};
pub use credentials::{ClientSecrets, Credential, OAuthToken, load_token, save_token};
pub use flow::{GMAIL_READONLY_SCOPE, RedirectOutcome, consent_url, parse_redirect_request};

#[derive(Error, Debug)]
pub enum GmailError {
    #[error("no OAuth client secrets file configured (set --credentials or GMAIL_CREDENTIALS_PATH)")]
    MissingClientSecrets,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid client secrets: {0}")]
    InvalidClientSecrets(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("authorization was not granted: {0}")]
    Consent(String),
    #[error("loopback listener error: {0}")]
    Listener(#[from] std::io::Error),
}
