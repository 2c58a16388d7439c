//! Metadata sources and the title → record resolution step.

pub mod mock;
pub mod pubmed;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::authors::{AuthorName, summarize_authors};
use crate::title::clean_title_for_search;
use crate::{CandidateLink, ResolvedRecord};

/// Author line used when no record could be fetched.
pub const AUTHOR_NOT_FOUND: &str = "Author information not found.";

/// Abstract line used when no record could be fetched.
pub const ABSTRACT_NO_PMID: &str =
    "The abstract could not be extracted as no PMID was obtained. Please check URL.";

/// Abstract line used when a fetched record has no `AbstractText`.
pub const ABSTRACT_MISSING: &str = "No abstract found.";

/// Fields parsed out of a full bibliographic record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub authors: Vec<AuthorName>,
}

/// Failure of a single lookup request. Always absorbed into a fallback record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::Transport(e.to_string())
    }
}

/// A bibliographic database that can map a title query to an identifier and
/// an identifier to a full record.
pub trait MetadataSource: Send + Sync {
    /// The canonical name of this source (e.g., "PubMed").
    fn name(&self) -> &str;

    /// Free-text search; returns the first identifier, if any.
    fn search<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, LookupError>> + Send + 'a>>;

    /// Fetch the full record for an identifier returned by [`search`](Self::search).
    fn fetch<'a>(
        &'a self,
        id: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ArticleRecord, LookupError>> + Send + 'a>>;
}

fn not_found(candidate: &CandidateLink, pmid: Option<String>) -> ResolvedRecord {
    ResolvedRecord {
        title: candidate.title.clone(),
        link: candidate.link.clone(),
        authors: AUTHOR_NOT_FOUND.to_string(),
        abstract_text: ABSTRACT_NO_PMID.to_string(),
        pmid,
    }
}

/// Resolve one candidate into its digest record.
///
/// Never fails: a missing identifier or a failed request yields the
/// "not found" fallback. A candidate without an identifier never reaches
/// the fetch stage.
pub async fn resolve_candidate(
    source: &dyn MetadataSource,
    client: &reqwest::Client,
    candidate: &CandidateLink,
) -> ResolvedRecord {
    let query = clean_title_for_search(&candidate.title);
    if query.is_empty() {
        tracing::debug!(title = %candidate.title, "empty search query, skipping lookup");
        return not_found(candidate, None);
    }

    let pmid = match source.search(&query, client).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            tracing::debug!(db = source.name(), query = %query, "no identifier");
            return not_found(candidate, None);
        }
        Err(e) => {
            tracing::warn!(db = source.name(), query = %query, error = %e, "search failed");
            return not_found(candidate, None);
        }
    };

    match source.fetch(&pmid, client).await {
        Ok(record) => ResolvedRecord {
            title: record
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| candidate.title.clone()),
            link: candidate.link.clone(),
            authors: summarize_authors(&record.authors),
            abstract_text: record
                .abstract_text
                .unwrap_or_else(|| ABSTRACT_MISSING.to_string()),
            pmid: Some(pmid),
        },
        Err(e) => {
            tracing::warn!(db = source.name(), pmid = %pmid, error = %e, "record fetch failed");
            not_found(candidate, Some(pmid))
        }
    }
}
