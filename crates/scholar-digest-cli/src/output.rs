use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use scholar_digest_core::ProgressEvent;
use scholar_digest_core::pipeline::FetchedAlert;
use scholar_digest_core::resolve::AUTHOR_NOT_FOUND;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn shorten(title: &str) -> String {
    if title.chars().count() > 60 {
        let head: String = title.chars().take(60).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

/// Print a real-time progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::MessagesListed { total } => {
            writeln!(w, "Found {} alert email(s)", total)?;
        }
        ProgressEvent::MessageFetched {
            index,
            total,
            id,
            date,
            candidates,
        } => {
            let date = date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown date".to_string());
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {} ({}): {} link(s)",
                    index + 1,
                    total,
                    id.bold(),
                    date,
                    candidates
                )?;
            } else {
                writeln!(
                    w,
                    "[{}/{}] {} ({}): {} link(s)",
                    index + 1,
                    total,
                    id,
                    date,
                    candidates
                )?;
            }
        }
        ProgressEvent::Resolving { title } => {
            writeln!(w, "  Looking up: \"{}\"", shorten(title))?;
        }
        ProgressEvent::Resolved { record, .. } => match (&record.pmid, color.enabled()) {
            (Some(pmid), true) => writeln!(w, "  -> {} {}", "PMID".green(), pmid)?,
            (Some(pmid), false) => writeln!(w, "  -> PMID {}", pmid)?,
            (None, true) => writeln!(w, "  -> {}", "no PMID".yellow())?,
            (None, false) => writeln!(w, "  -> no PMID")?,
        },
        ProgressEvent::DuplicateSkipped { title } => {
            if color.enabled() {
                writeln!(w, "  {}", format!("Skipping duplicate: \"{}\"", shorten(title)).dimmed())?;
            } else {
                writeln!(w, "  Skipping duplicate: \"{}\"", shorten(title))?;
            }
        }
    }
    Ok(())
}

/// Print what a dry run found: each alert and the links it carries.
pub fn print_dry_run(
    w: &mut dyn Write,
    alerts: &[FetchedAlert],
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {} alert email(s)\n", "DRY RUN:".bold().cyan(), alerts.len())?;
    } else {
        writeln!(w, "DRY RUN: {} alert email(s)\n", alerts.len())?;
    }

    let mut links = 0;
    for alert in alerts {
        let date = alert
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        if color.enabled() {
            writeln!(w, "{} ({})", alert.id.bold().yellow(), date)?;
        } else {
            writeln!(w, "{} ({})", alert.id, date)?;
        }
        for candidate in &alert.candidates {
            writeln!(w, "  Title: {}", candidate.title)?;
            if color.enabled() {
                writeln!(w, "  Link:  {}", candidate.link.dimmed())?;
            } else {
                writeln!(w, "  Link:  {}", candidate.link)?;
            }
        }
        links += alert.candidates.len();
        writeln!(w)?;
    }

    writeln!(w, "Total: {} scholar link(s)", links)?;
    Ok(())
}

/// Final status line after the digest has been written.
pub fn print_created(
    w: &mut dyn Write,
    path: &Path,
    records: usize,
    unresolved: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    if unresolved > 0 {
        let note = format!("({} of {} records without author information)", unresolved, records);
        if color.enabled() {
            writeln!(w, "{}", note.dimmed())?;
        } else {
            writeln!(w, "{}", note)?;
        }
    }
    if color.enabled() {
        writeln!(w, "{} {}", "Markdown file has been created:".green(), path.display())?;
    } else {
        writeln!(w, "Markdown file has been created: {}", path.display())?;
    }
    Ok(())
}

/// Records whose lookup produced no author list.
pub fn count_unresolved(records: &[scholar_digest_core::ResolvedRecord]) -> usize {
    records.iter().filter(|r| r.authors == AUTHOR_NOT_FOUND).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scholar_digest_core::{CandidateLink, ResolvedRecord};

    fn render(event: ProgressEvent) -> String {
        let mut buf = Vec::new();
        print_progress(&mut buf, &event, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_message_fetched_line() {
        let out = render(ProgressEvent::MessageFetched {
            index: 0,
            total: 2,
            id: "abc".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 3),
            candidates: 4,
        });
        assert_eq!(out, "[1/2] abc (2024-01-03): 4 link(s)\n");
    }

    #[test]
    fn test_long_title_is_shortened_on_char_boundary() {
        let title = "é".repeat(80);
        let out = render(ProgressEvent::Resolving { title });
        assert!(out.contains(&format!("{}...", "é".repeat(60))));
    }

    #[test]
    fn test_resolved_without_pmid() {
        let out = render(ProgressEvent::Resolved {
            index: 0,
            record: Box::new(ResolvedRecord {
                title: "T".into(),
                link: "L".into(),
                authors: AUTHOR_NOT_FOUND.into(),
                abstract_text: "A".into(),
                pmid: None,
            }),
        });
        assert_eq!(out, "  -> no PMID\n");
    }

    #[test]
    fn test_dry_run_lists_links() {
        let alerts = vec![FetchedAlert {
            id: "m1".into(),
            date: None,
            candidates: vec![CandidateLink {
                title: "Paper".into(),
                link: "https://scholar.google.com/scholar_url?url=1".into(),
            }],
        }];
        let mut buf = Vec::new();
        print_dry_run(&mut buf, &alerts, ColorMode(false)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("DRY RUN: 1 alert email(s)\n"));
        assert!(out.contains("m1 (unknown date)\n  Title: Paper\n"));
        assert!(out.ends_with("Total: 1 scholar link(s)\n"));
    }

    #[test]
    fn test_created_line() {
        let mut buf = Vec::new();
        print_created(
            &mut buf,
            Path::new("out/GSEmail_2024-01-03.md"),
            3,
            0,
            ColorMode(false),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Markdown file has been created: out/GSEmail_2024-01-03.md\n"
        );
    }
}
