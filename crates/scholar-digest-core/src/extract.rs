//! Alert body selection and scholar link extraction.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{CandidateLink, MessagePart};

/// Scholar redirect prefixes recognised out of the box.
pub const DEFAULT_SCHOLAR_DOMAINS: &[&str] = &[
    "scholar.google.com/scholar_url?",
    "scholar.google.co.kr/scholar_url?",
];

/// Gmail emits base64url, with or without trailing padding.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

type BodyStrategy = fn(&MessagePart) -> Option<String>;

/// Body sources in priority order. The first one producing a non-empty body wins.
const BODY_STRATEGIES: &[(&str, BodyStrategy)] = &[
    ("html part", html_part),
    ("plain part", plain_part),
    ("payload body", payload_body),
];

/// Pick the decoded body of a message payload, or `None` if no source has one.
pub fn select_body(payload: &MessagePart) -> Option<String> {
    BODY_STRATEGIES.iter().find_map(|(name, strategy)| {
        let body = strategy(payload)?;
        tracing::debug!(strategy = name, len = body.len(), "selected message body");
        Some(body)
    })
}

fn html_part(payload: &MessagePart) -> Option<String> {
    first_decoded_part(&payload.parts, "text/html")
}

fn plain_part(payload: &MessagePart) -> Option<String> {
    first_decoded_part(&payload.parts, "text/plain")
}

fn payload_body(payload: &MessagePart) -> Option<String> {
    payload.data.as_deref().and_then(decode_part_data)
}

/// Depth-first search for the first part of `mime` whose data decodes to a
/// non-empty string.
fn first_decoded_part(parts: &[MessagePart], mime: &str) -> Option<String> {
    for part in parts {
        if mime_matches(&part.mime_type, mime)
            && let Some(body) = part.data.as_deref().and_then(decode_part_data)
        {
            return Some(body);
        }
        if let Some(body) = first_decoded_part(&part.parts, mime) {
            return Some(body);
        }
    }
    None
}

fn mime_matches(actual: &str, expected: &str) -> bool {
    actual
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Decode base64url part data into text. Invalid UTF-8 is replaced rather
/// than rejected; undecodable data yields `None`.
pub fn decode_part_data(data: &str) -> Option<String> {
    match BASE64URL.decode(data.trim()) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            if text.is_empty() { None } else { Some(text) }
        }
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable message part");
            None
        }
    }
}

/// Collapse internal whitespace runs and trim.
fn collapse_whitespace(text: &str) -> String {
    static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    WS.replace_all(text, " ").trim().to_string()
}

/// Extract every anchor whose `href` contains one of `domains` verbatim, in
/// document order. Malformed markup is parsed best-effort and never fails.
pub fn extract_scholar_links(html: &str, domains: &[String]) -> Vec<CandidateLink> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            if !domains.iter().any(|d| href.contains(d.as_str())) {
                return None;
            }
            Some(CandidateLink {
                title: collapse_whitespace(&element.text().collect::<String>()),
                link: href.to_string(),
            })
        })
        .collect()
}
