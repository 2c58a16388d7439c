//! The per-run fold: list alerts, extract links, resolve unseen titles.
//!
//! Everything runs strictly in sequence. Each message is fetched, its links
//! are resolved one at a time, and only then is the next message fetched.

use chrono::NaiveDate;

use crate::digest::Digest;
use crate::extract::{extract_scholar_links, select_body};
use crate::mailbox::Mailbox;
use crate::resolve::{MetadataSource, resolve_candidate};
use crate::{AlertMessage, CandidateLink, Config, CoreError, ProgressEvent};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The mailbox query matched nothing; there is nothing to report.
    NoMessages,
    Completed(Digest),
}

/// One fetched alert reduced to what the digest needs.
#[derive(Debug, Clone)]
pub struct FetchedAlert {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub candidates: Vec<CandidateLink>,
}

/// Scholar links in a message body. A message without a usable body has none.
pub fn candidates_for(message: &AlertMessage, domains: &[String]) -> Vec<CandidateLink> {
    match select_body(&message.payload) {
        Some(body) => extract_scholar_links(&body, domains),
        None => {
            tracing::debug!(id = %message.id, "message has no body");
            vec![]
        }
    }
}

async fn fetch_alert(
    mailbox: &dyn Mailbox,
    id: &str,
    domains: &[String],
) -> Result<FetchedAlert, CoreError> {
    let message = mailbox.get_message(id).await?;
    Ok(FetchedAlert {
        id: message.id.clone(),
        date: message.arrival_date(),
        candidates: candidates_for(&message, domains),
    })
}

/// Fetch every matching alert and extract its links without resolving them.
pub async fn collect_alerts(
    mailbox: &dyn Mailbox,
    config: &Config,
) -> Result<Vec<FetchedAlert>, CoreError> {
    let ids = mailbox
        .list_message_ids(&config.query, config.max_results)
        .await?;
    let mut alerts = Vec::with_capacity(ids.len());
    for id in &ids {
        alerts.push(fetch_alert(mailbox, id, &config.scholar_domains).await?);
    }
    Ok(alerts)
}

/// Run the whole pipeline and return the assembled digest.
///
/// Mailbox failures abort the run. Lookup failures never do; they turn into
/// fallback records.
pub async fn run(
    mailbox: &dyn Mailbox,
    source: &dyn MetadataSource,
    client: &reqwest::Client,
    config: &Config,
    progress: impl Fn(ProgressEvent),
) -> Result<RunOutcome, CoreError> {
    let ids = mailbox
        .list_message_ids(&config.query, config.max_results)
        .await?;
    if ids.is_empty() {
        tracing::info!(query = %config.query, "no messages matched");
        return Ok(RunOutcome::NoMessages);
    }

    let total = ids.len();
    progress(ProgressEvent::MessagesListed { total });

    let mut digest = Digest::new();
    for (index, id) in ids.iter().enumerate() {
        let alert = fetch_alert(mailbox, id, &config.scholar_domains).await?;
        if let Some(date) = alert.date {
            digest.observe_date(date);
        }
        progress(ProgressEvent::MessageFetched {
            index,
            total,
            id: alert.id.clone(),
            date: alert.date,
            candidates: alert.candidates.len(),
        });

        for candidate in &alert.candidates {
            if !digest.claim_title(&candidate.title) {
                progress(ProgressEvent::DuplicateSkipped {
                    title: candidate.title.clone(),
                });
                continue;
            }

            progress(ProgressEvent::Resolving {
                title: candidate.title.clone(),
            });
            let record = resolve_candidate(source, client, candidate).await;
            digest.push(record.clone());
            progress(ProgressEvent::Resolved {
                index: digest.len(),
                record: Box::new(record),
            });
        }
    }

    tracing::info!(
        messages = total,
        records = digest.len(),
        "digest assembled"
    );
    Ok(RunOutcome::Completed(digest))
}
