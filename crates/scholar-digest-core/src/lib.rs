use std::path::PathBuf;

use chrono::{Local, NaiveDate, TimeZone};
use thiserror::Error;

pub mod authors;
pub mod config_file;
pub mod digest;
pub mod extract;
pub mod mailbox;
pub mod pipeline;
pub mod resolve;
pub mod title;

// Re-export for convenience
pub use digest::Digest;
pub use extract::{DEFAULT_SCHOLAR_DOMAINS, extract_scholar_links, select_body};
pub use mailbox::{Mailbox, MailboxError};
pub use pipeline::{RunOutcome, run};
pub use resolve::{LookupError, MetadataSource, resolve_candidate};
pub use title::clean_title_for_search;

/// Gmail search query matching Google Scholar alert emails.
pub const DEFAULT_QUERY: &str = "from:scholaralerts-noreply@google.com";

/// Number of alert emails fetched per run.
pub const DEFAULT_MAX_RESULTS: u32 = 2;

/// One part of a message payload. Parts nest (e.g. `multipart/alternative`
/// inside `multipart/mixed`); `data` is base64url-encoded when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePart {
    pub mime_type: String,
    pub data: Option<String>,
    pub parts: Vec<MessagePart>,
}

/// A single alert email as fetched from the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub id: String,
    /// Arrival time in milliseconds since the Unix epoch.
    pub internal_date: Option<i64>,
    pub payload: MessagePart,
}

impl AlertMessage {
    /// Local calendar date the message arrived on.
    pub fn arrival_date(&self) -> Option<NaiveDate> {
        let ms = self.internal_date?;
        Local
            .timestamp_millis_opt(ms)
            .single()
            .map(|dt| dt.date_naive())
    }
}

/// A scholar link pulled out of an alert body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub title: String,
    pub link: String,
}

/// The final, uniform digest entry for one distinct title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub title: String,
    pub link: String,
    pub authors: String,
    pub abstract_text: String,
    pub pmid: Option<String>,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailboxError),
}

/// Progress events emitted while a run is in flight.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    MessagesListed {
        total: usize,
    },
    MessageFetched {
        index: usize,
        total: usize,
        id: String,
        date: Option<NaiveDate>,
        candidates: usize,
    },
    Resolving {
        title: String,
    },
    Resolved {
        index: usize,
        record: Box<ResolvedRecord>,
    },
    DuplicateSkipped {
        title: String,
    },
}

/// Configuration for a digest run.
#[derive(Debug, Clone)]
pub struct Config {
    pub query: String,
    pub max_results: u32,
    /// Literal href substrings that mark an anchor as a scholar link.
    pub scholar_domains: Vec<String>,
    pub esearch_url: String,
    pub efetch_url: String,
    pub database: String,
    pub ncbi_api_key: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub token_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            scholar_domains: DEFAULT_SCHOLAR_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            esearch_url: resolve::pubmed::ESEARCH_URL.to_string(),
            efetch_url: resolve::pubmed::EFETCH_URL.to_string(),
            database: "pubmed".to_string(),
            ncbi_api_key: None,
            credentials_path: None,
            token_path: PathBuf::from("token.json"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Overlay values present in a config file onto this config.
    pub fn apply_file(&mut self, file: &config_file::ConfigFile) {
        if let Some(gmail) = &file.gmail {
            if let Some(path) = &gmail.credentials_path {
                self.credentials_path = Some(PathBuf::from(path));
            }
            if let Some(path) = &gmail.token_path {
                self.token_path = PathBuf::from(path);
            }
            if let Some(query) = &gmail.query {
                self.query = query.clone();
            }
            if let Some(n) = gmail.max_results {
                self.max_results = n;
            }
        }
        if let Some(pubmed) = &file.pubmed {
            if let Some(url) = &pubmed.esearch_url {
                self.esearch_url = url.clone();
            }
            if let Some(url) = &pubmed.efetch_url {
                self.efetch_url = url.clone();
            }
            if let Some(db) = &pubmed.database {
                self.database = db.clone();
            }
            if pubmed.api_key.is_some() {
                self.ncbi_api_key = pubmed.api_key.clone();
            }
        }
        if let Some(domains) = file
            .extraction
            .as_ref()
            .and_then(|e| e.scholar_domains.as_ref())
            && !domains.is_empty()
        {
            self.scholar_domains = domains.clone();
        }
        if let Some(dir) = file.output.as_ref().and_then(|o| o.directory.as_ref()) {
            self.output_dir = PathBuf::from(dir);
        }
    }
}
