use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use scholar_digest_core::{Digest, ResolvedRecord};

use crate::ReportError;

pub const FILENAME_PREFIX: &str = "GSEmail";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render the digest as Markdown. Records appear exactly in digest order.
pub fn render_markdown(digest: &Digest, generated_on: NaiveDate) -> String {
    let mut out = String::from("## Google Scholar Mailing Literature Summary\n\n");
    out.push_str(&format!(
        "**Report generated on**: {}\n\n",
        generated_on.format(DATE_FORMAT)
    ));
    if let Some((first, last)) = digest.date_range() {
        out.push_str(&format!(
            "**Date range of emails**: {} ~ {}\n\n",
            first.format(DATE_FORMAT),
            last.format(DATE_FORMAT)
        ));
    }

    for record in digest.records() {
        write_md_record(&mut out, record);
    }
    out
}

fn write_md_record(out: &mut String, r: &ResolvedRecord) {
    out.push_str(&format!("### {}\n", r.title));
    out.push_str(&format!("### {}\n", r.authors));
    out.push_str(&format!("### Link: [click]({})\n", r.link));
    if let Some(pmid) = &r.pmid {
        out.push_str(&format!("### PMID: {}\n", pmid));
    }
    out.push_str(&format!("\n### Abstract:\n{}\n\n", r.abstract_text));
}

/// `GSEmail_<first>_<last>.md`, or `GSEmail_<today>.md` without a date range.
pub fn output_filename(range: Option<(NaiveDate, NaiveDate)>, today: NaiveDate) -> String {
    match range {
        Some((first, last)) => format!(
            "{}_{}_{}.md",
            FILENAME_PREFIX,
            first.format(DATE_FORMAT),
            last.format(DATE_FORMAT)
        ),
        None => format!("{}_{}.md", FILENAME_PREFIX, today.format(DATE_FORMAT)),
    }
}

/// Render the digest and write it into `dir`. Returns the written path.
pub fn write_digest(dir: &Path, digest: &Digest, today: NaiveDate) -> Result<PathBuf, ReportError> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let path = dir.join(output_filename(digest.date_range(), today));
    let content = render_markdown(digest, today);

    let write_err = |source| ReportError::Write {
        path: path.clone(),
        source,
    };
    let mut file = std::fs::File::create(&path).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;

    tracing::info!(path = %path.display(), records = digest.len(), "digest written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolved(title: &str, pmid: Option<&str>) -> ResolvedRecord {
        ResolvedRecord {
            title: title.to_string(),
            link: "https://scholar.google.com/scholar_url?url=x".to_string(),
            authors: "Jane Doe, John Smith, et al.".to_string(),
            abstract_text: "Body.".to_string(),
            pmid: pmid.map(String::from),
        }
    }

    #[test]
    fn test_filename_with_range() {
        assert_eq!(
            output_filename(Some((date(2024, 1, 3), date(2024, 1, 5))), date(2024, 2, 1)),
            "GSEmail_2024-01-03_2024-01-05.md"
        );
    }

    #[test]
    fn test_filename_same_day_range() {
        assert_eq!(
            output_filename(Some((date(2024, 1, 3), date(2024, 1, 3))), date(2024, 2, 1)),
            "GSEmail_2024-01-03_2024-01-03.md"
        );
    }

    #[test]
    fn test_filename_without_range() {
        assert_eq!(
            output_filename(None, date(2024, 2, 1)),
            "GSEmail_2024-02-01.md"
        );
    }

    #[test]
    fn test_render_header_only() {
        let digest = Digest::new();
        assert_eq!(
            render_markdown(&digest, date(2024, 2, 1)),
            "## Google Scholar Mailing Literature Summary\n\n**Report generated on**: 2024-02-01\n\n"
        );
    }

    #[test]
    fn test_render_full_digest() {
        let mut digest = Digest::new();
        digest.observe_date(date(2024, 1, 5));
        digest.observe_date(date(2024, 1, 3));
        digest.push(resolved("First", Some("123")));
        digest.push(resolved("Second", None));

        let expected = "## Google Scholar Mailing Literature Summary\n\n\
**Report generated on**: 2024-02-01\n\n\
**Date range of emails**: 2024-01-03 ~ 2024-01-05\n\n\
### First\n\
### Jane Doe, John Smith, et al.\n\
### Link: [click](https://scholar.google.com/scholar_url?url=x)\n\
### PMID: 123\n\
\n### Abstract:\nBody.\n\n\
### Second\n\
### Jane Doe, John Smith, et al.\n\
### Link: [click](https://scholar.google.com/scholar_url?url=x)\n\
\n### Abstract:\nBody.\n\n";
        assert_eq!(render_markdown(&digest, date(2024, 2, 1)), expected);
    }

    #[test]
    fn test_render_preserves_record_order() {
        let mut digest = Digest::new();
        for title in ["Zeta", "Alpha", "Mu"] {
            digest.push(resolved(title, None));
        }
        let out = render_markdown(&digest, date(2024, 2, 1));
        let zeta = out.find("### Zeta").unwrap();
        let alpha = out.find("### Alpha").unwrap();
        let mu = out.find("### Mu").unwrap();
        assert!(zeta < alpha && alpha < mu);
    }
}
