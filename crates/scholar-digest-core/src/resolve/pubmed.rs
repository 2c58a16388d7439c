use std::future::Future;
use std::pin::Pin;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{ArticleRecord, LookupError, MetadataSource};
use crate::Config;
use crate::authors::AuthorName;

pub const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
pub const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// NCBI E-utilities client: `esearch` for the PMID, `efetch` for the record.
pub struct PubMed {
    esearch_url: String,
    efetch_url: String,
    database: String,
    api_key: Option<String>,
}

impl Default for PubMed {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PubMed {
    pub fn from_config(config: &Config) -> Self {
        Self {
            esearch_url: config.esearch_url.clone(),
            efetch_url: config.efetch_url.clone(),
            database: config.database.clone(),
            api_key: config.ncbi_api_key.clone(),
        }
    }

    fn params<'a>(&'a self, extra: [(&'a str, &'a str); 2]) -> Vec<(&'a str, &'a str)> {
        let mut params = vec![("db", self.database.as_str())];
        params.extend(extra);
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.as_str()));
        }
        params
    }
}

impl MetadataSource for PubMed {
    fn name(&self) -> &str {
        "PubMed"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, LookupError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = client
                .get(&self.esearch_url)
                .query(&self.params([("term", query), ("retmode", "json")]))
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LookupError::Status(status.as_u16()));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| LookupError::Malformed(e.to_string()))?;
            let first = data["esearchresult"]["idlist"]
                .as_array()
                .and_then(|ids| ids.first())
                .and_then(|id| id.as_str())
                .map(String::from);

            tracing::debug!(query, pmid = ?first, "esearch complete");
            Ok(first)
        })
    }

    fn fetch<'a>(
        &'a self,
        id: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<ArticleRecord, LookupError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = client
                .get(&self.efetch_url)
                .query(&self.params([("id", id), ("retmode", "xml")]))
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LookupError::Status(status.as_u16()));
            }

            let body = resp.text().await?;
            parse_pubmed_xml(&body)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Abstract,
    ForeName,
    LastName,
}

impl Field {
    fn tag(self) -> &'static [u8] {
        match self {
            Field::Title => b"ArticleTitle",
            Field::Abstract => b"AbstractText",
            Field::ForeName => b"ForeName",
            Field::LastName => b"LastName",
        }
    }
}

fn store(
    field: Field,
    text: String,
    record: &mut ArticleRecord,
    author: &mut Option<AuthorName>,
) {
    match field {
        Field::Title => record.title = Some(text),
        Field::Abstract => record.abstract_text = Some(text),
        Field::ForeName => {
            if let Some(a) = author.as_mut() {
                a.fore_name = Some(text);
            }
        }
        Field::LastName => {
            if let Some(a) = author.as_mut() {
                a.last_name = Some(text);
            }
        }
    }
}

/// Which field, if any, a start tag opens given what has been captured so far.
/// Only the first `ArticleTitle`/`AbstractText` in the document counts, and
/// name parts only count inside an `Author`.
fn field_for(name: &[u8], record: &ArticleRecord, author: &Option<AuthorName>) -> Option<Field> {
    match name {
        b"ArticleTitle" if record.title.is_none() => Some(Field::Title),
        b"AbstractText" if record.abstract_text.is_none() => Some(Field::Abstract),
        b"ForeName" if author.as_ref().is_some_and(|a| a.fore_name.is_none()) => {
            Some(Field::ForeName)
        }
        b"LastName" if author.as_ref().is_some_and(|a| a.last_name.is_none()) => {
            Some(Field::LastName)
        }
        _ => None,
    }
}

fn is_article(name: &[u8]) -> bool {
    name == b"PubmedArticle" || name == b"PubmedBookArticle"
}

/// Parse an `efetch` PubMed XML document.
///
/// Text of nested inline markup (`<i>`, `<sup>`, ...) is kept. A document
/// that is not well-formed XML, or that carries no `PubmedArticle`, is
/// [`LookupError::Malformed`].
pub fn parse_pubmed_xml(xml: &str) -> Result<ArticleRecord, LookupError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;

    let mut record = ArticleRecord::default();
    let mut capture: Option<(Field, String)> = None;
    let mut author: Option<AuthorName> = None;
    let mut saw_article = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if capture.is_none() {
                    let local = e.local_name();
                    if is_article(local.as_ref()) {
                        saw_article = true;
                    } else if local.as_ref() == b"Author" {
                        author = Some(AuthorName::default());
                    } else if let Some(field) = field_for(local.as_ref(), &record, &author) {
                        capture = Some((field, String::new()));
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if capture.is_none()
                    && let Some(field) = field_for(e.local_name().as_ref(), &record, &author)
                {
                    store(field, String::new(), &mut record, &mut author);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some((_, text)) = capture.as_mut() {
                    match e.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(err) => {
                            tracing::warn!(error = %err, "keeping raw text with unresolved entity");
                            text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(ref e)) => {
                let local = e.local_name();
                if let Some((field, text)) =
                    capture.take_if(|(field, _)| field.tag() == local.as_ref())
                {
                    store(field, text, &mut record, &mut author);
                } else if capture.is_none()
                    && local.as_ref() == b"Author"
                    && let Some(done) = author.take()
                {
                    record.authors.push(done);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LookupError::Malformed(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_article {
        return Err(LookupError::Malformed("no PubmedArticle in efetch response".into()));
    }
    Ok(record)
}
