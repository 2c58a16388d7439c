//! Mock metadata source for testing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use super::{ArticleRecord, LookupError, MetadataSource};

/// A hand-rolled mock implementing [`MetadataSource`] for tests.
///
/// Unknown queries search to "no identifier"; unknown identifiers fail to
/// fetch with a 404. Every call is recorded in order.
#[derive(Default)]
pub struct MockSource {
    searches: HashMap<String, Result<Option<String>, LookupError>>,
    records: HashMap<String, Result<ArticleRecord, LookupError>>,
    search_calls: Mutex<Vec<String>>,
    fetch_calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `query` search to identifier `id`.
    pub fn with_hit(mut self, query: &str, id: &str) -> Self {
        self.searches
            .insert(query.to_string(), Ok(Some(id.to_string())));
        self
    }

    pub fn with_search_error(mut self, query: &str, err: LookupError) -> Self {
        self.searches.insert(query.to_string(), Err(err));
        self
    }

    pub fn with_record(mut self, id: &str, record: ArticleRecord) -> Self {
        self.records.insert(id.to_string(), Ok(record));
        self
    }

    pub fn with_fetch_error(mut self, id: &str, err: LookupError) -> Self {
        self.records.insert(id.to_string(), Err(err));
        self
    }

    /// Queries passed to `search()`, in call order.
    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().unwrap().clone()
    }

    /// Identifiers passed to `fetch()`, in call order.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

impl MetadataSource for MockSource {
    fn name(&self) -> &str {
        "Mock"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, LookupError>> + Send + 'a>> {
        self.search_calls.lock().unwrap().push(query.to_string());
        let response = self.searches.get(query).cloned().unwrap_or(Ok(None));
        Box::pin(async move { response })
    }

    fn fetch<'a>(
        &'a self,
        id: &'a str,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ArticleRecord, LookupError>> + Send + 'a>> {
        self.fetch_calls.lock().unwrap().push(id.to_string());
        let response = self
            .records
            .get(id)
            .cloned()
            .unwrap_or(Err(LookupError::Status(404)));
        Box::pin(async move { response })
    }
}
