//! End-to-end runs of the digest pipeline against the in-memory mailbox and
//! metadata source. No network access.

use std::sync::Mutex;

use base64::Engine;
use scholar_digest_core::authors::AuthorName;
use scholar_digest_core::mailbox::MailboxError;
use scholar_digest_core::mailbox::mock::MockMailbox;
use scholar_digest_core::pipeline::collect_alerts;
use scholar_digest_core::resolve::mock::MockSource;
use scholar_digest_core::resolve::{ABSTRACT_NO_PMID, AUTHOR_NOT_FOUND, ArticleRecord};
use scholar_digest_core::{
    AlertMessage, Config, CoreError, MessagePart, ProgressEvent, RunOutcome, run,
};

fn html_message(id: &str, internal_date: Option<i64>, html: &str) -> AlertMessage {
    let data = base64::engine::general_purpose::URL_SAFE.encode(html.as_bytes());
    AlertMessage {
        id: id.to_string(),
        internal_date,
        payload: MessagePart {
            mime_type: "multipart/alternative".into(),
            data: None,
            parts: vec![MessagePart {
                mime_type: "text/html".into(),
                data: Some(data),
                parts: vec![],
            }],
        },
    }
}

fn anchor(title: &str, n: usize) -> String {
    format!(r#"<h3><a href="https://scholar.google.com/scholar_url?url=https://j.org/{n}&amp;hl=en">{title}</a></h3>"#)
}

async fn run_to_digest(
    mailbox: &MockMailbox,
    source: &MockSource,
) -> scholar_digest_core::Digest {
    let client = reqwest::Client::new();
    match run(mailbox, source, &client, &Config::default(), |_| {})
        .await
        .expect("run should succeed")
    {
        RunOutcome::Completed(digest) => digest,
        RunOutcome::NoMessages => panic!("expected a completed run"),
    }
}

#[tokio::test]
async fn no_identifier_yields_fallback_record() {
    let mailbox = MockMailbox::new(vec![html_message(
        "m1",
        Some(1_704_283_200_000),
        &anchor("Obscure preprint: nobody indexed it", 1),
    )]);
    let source = MockSource::new();

    let digest = run_to_digest(&mailbox, &source).await;
    assert_eq!(digest.len(), 1);
    let record = &digest.records()[0];
    assert_eq!(record.title, "Obscure preprint: nobody indexed it");
    assert_eq!(record.authors, "Author information not found.");
    assert_eq!(
        record.abstract_text,
        "The abstract could not be extracted as no PMID was obtained. Please check URL."
    );
    assert_eq!(record.pmid, None);
    assert_eq!(source.search_calls(), vec!["Obscure preprint".to_string()]);
    assert!(source.fetch_calls().is_empty());
}

#[tokio::test]
async fn shared_title_across_messages_resolves_once() {
    let html_a = format!("{}{}", anchor("Shared title", 1), anchor("Only in A", 2));
    let html_b = format!("{}{}", anchor("Only in B", 3), anchor("Shared title", 4));
    let mailbox = MockMailbox::new(vec![
        html_message("a", Some(1_704_283_200_000), &html_a),
        html_message("b", Some(1_704_456_000_000), &html_b),
    ]);
    let source = MockSource::new();

    let digest = run_to_digest(&mailbox, &source).await;
    let titles: Vec<&str> = digest.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Shared title", "Only in A", "Only in B"]);
    // The first occurrence wins, including its link.
    assert!(digest.records()[0].link.ends_with("j.org/1&hl=en"));
    assert_eq!(source.search_calls().len(), 3);
}

#[tokio::test]
async fn resolved_record_uses_canonical_metadata() {
    let mailbox = MockMailbox::new(vec![html_message(
        "m1",
        None,
        &anchor("Deep learning: a review...", 1),
    )]);
    let source = MockSource::new().with_hit("Deep learning", "38000001").with_record(
        "38000001",
        ArticleRecord {
            title: Some("Deep learning: a review of the field.".into()),
            abstract_text: Some("Abstract text.".into()),
            authors: vec![
                AuthorName::new("Jane", "Doe"),
                AuthorName::new("John", "Smith"),
                AuthorName::new("Ann", "Lee"),
            ],
        },
    );

    let digest = run_to_digest(&mailbox, &source).await;
    let record = &digest.records()[0];
    assert_eq!(record.title, "Deep learning: a review of the field.");
    assert_eq!(record.authors, "Jane Doe, John Smith, et al.");
    assert_eq!(record.abstract_text, "Abstract text.");
    assert_eq!(record.pmid.as_deref(), Some("38000001"));
    assert_eq!(digest.date_range(), None);
}

#[tokio::test]
async fn empty_mailbox_is_no_messages() {
    let mailbox = MockMailbox::new(vec![]);
    let source = MockSource::new();
    let client = reqwest::Client::new();
    let events = Mutex::new(Vec::new());

    let outcome = run(&mailbox, &source, &client, &Config::default(), |e| {
        events.lock().unwrap().push(e)
    })
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::NoMessages));
    assert!(events.lock().unwrap().is_empty());
    assert!(source.search_calls().is_empty());
}

#[tokio::test]
async fn message_without_body_contributes_nothing() {
    let empty = AlertMessage {
        id: "empty".into(),
        internal_date: Some(1_704_283_200_000),
        payload: MessagePart {
            mime_type: "multipart/mixed".into(),
            data: None,
            parts: vec![],
        },
    };
    let mailbox = MockMailbox::new(vec![empty]);
    let source = MockSource::new();

    let digest = run_to_digest(&mailbox, &source).await;
    assert!(digest.is_empty());
    // The date still counts towards the report range.
    assert!(digest.date_range().is_some());
}

#[tokio::test]
async fn lookup_failures_do_not_abort() {
    let html = format!("{}{}", anchor("Broken search", 1), anchor("Broken fetch", 2));
    let mailbox = MockMailbox::new(vec![html_message("m1", None, &html)]);
    let source = MockSource::new()
        .with_search_error(
            "Broken search",
            scholar_digest_core::LookupError::Transport("connection reset".into()),
        )
        .with_hit("Broken fetch", "99")
        .with_fetch_error("99", scholar_digest_core::LookupError::Status(500));

    let digest = run_to_digest(&mailbox, &source).await;
    assert_eq!(digest.len(), 2);
    assert_eq!(digest.records()[0].pmid, None);
    assert_eq!(digest.records()[1].pmid.as_deref(), Some("99"));
    for record in digest.records() {
        assert_eq!(record.authors, AUTHOR_NOT_FOUND);
        assert_eq!(record.abstract_text, ABSTRACT_NO_PMID);
    }
}

#[tokio::test]
async fn mailbox_failure_aborts_run() {
    let mailbox = MockMailbox::failing(MailboxError::Auth("token revoked".into()));
    let source = MockSource::new();
    let client = reqwest::Client::new();

    let err = run(&mailbox, &source, &client, &Config::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Mailbox(MailboxError::Auth(_))));
}

#[tokio::test]
async fn query_and_limit_come_from_config() {
    let mailbox = MockMailbox::new(vec![
        html_message("1", None, ""),
        html_message("2", None, ""),
        html_message("3", None, ""),
    ]);
    let config = Config {
        query: "from:alerts@example.org".into(),
        max_results: 2,
        ..Config::default()
    };

    let alerts = collect_alerts(&mailbox, &config).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(
        mailbox.queries(),
        vec![("from:alerts@example.org".to_string(), 2)]
    );
}

#[tokio::test]
async fn progress_reports_duplicates_and_resolutions() {
    let html = format!("{}{}", anchor("Same", 1), anchor("Same", 2));
    let mailbox = MockMailbox::new(vec![html_message("m1", None, &html)]);
    let source = MockSource::new();
    let client = reqwest::Client::new();
    let events = Mutex::new(Vec::new());

    run(&mailbox, &source, &client, &Config::default(), |e| {
        events.lock().unwrap().push(e)
    })
    .await
    .unwrap();

    let events = events.into_inner().unwrap();
    assert!(matches!(events[0], ProgressEvent::MessagesListed { total: 1 }));
    assert!(matches!(
        events[1],
        ProgressEvent::MessageFetched { candidates: 2, .. }
    ));
    assert!(matches!(events[2], ProgressEvent::Resolving { .. }));
    assert!(matches!(events[3], ProgressEvent::Resolved { index: 1, .. }));
    assert!(matches!(events[4], ProgressEvent::DuplicateSkipped { .. }));
    assert_eq!(events.len(), 5);
}
