//! Accumulates resolved records and message dates across one run.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::ResolvedRecord;

/// The records collected during one run, in first-seen order.
///
/// Deduplication is by exact raw anchor title across every processed message:
/// once a title has been claimed it is never resolved again, even when it
/// reappears in a later, unrelated alert.
#[derive(Debug, Clone, Default)]
pub struct Digest {
    seen_titles: HashSet<String>,
    records: Vec<ResolvedRecord>,
    dates: Vec<NaiveDate>,
}

impl Digest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `raw_title` as seen. Returns `false` if it already was.
    pub fn claim_title(&mut self, raw_title: &str) -> bool {
        if self.seen_titles.contains(raw_title) {
            return false;
        }
        self.seen_titles.insert(raw_title.to_string())
    }

    pub fn push(&mut self, record: ResolvedRecord) {
        self.records.push(record);
    }

    pub fn observe_date(&mut self, date: NaiveDate) {
        self.dates.push(date);
    }

    pub fn records(&self) -> &[ResolvedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest observed message dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.dates.iter().min()?;
        let max = self.dates.iter().max()?;
        Some((*min, *max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> ResolvedRecord {
        ResolvedRecord {
            title: title.to_string(),
            link: format!("https://scholar.google.com/scholar_url?q={title}"),
            authors: String::new(),
            abstract_text: String::new(),
            pmid: None,
        }
    }

    #[test]
    fn test_claim_title_once() {
        let mut digest = Digest::new();
        assert!(digest.claim_title("A"));
        assert!(!digest.claim_title("A"));
        assert!(digest.claim_title("B"));
    }

    #[test]
    fn test_claim_title_is_exact_match() {
        let mut digest = Digest::new();
        assert!(digest.claim_title("Deep learning"));
        assert!(digest.claim_title("Deep learning..."));
        assert!(digest.claim_title("deep learning"));
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let mut digest = Digest::new();
        for title in ["C", "A", "B"] {
            digest.push(record(title));
        }
        let titles: Vec<&str> = digest.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        assert_eq!(digest.len(), 3);
    }

    #[test]
    fn test_date_range() {
        let mut digest = Digest::new();
        assert_eq!(digest.date_range(), None);
        digest.observe_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        digest.observe_date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        digest.observe_date(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(
            digest.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
            ))
        );
    }
}
