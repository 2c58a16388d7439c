/// An `Author` element from a PubMed record. Either name may be missing
/// (collective authors carry neither).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorName {
    pub fore_name: Option<String>,
    pub last_name: Option<String>,
}

impl AuthorName {
    pub fn new(fore_name: &str, last_name: &str) -> Self {
        Self {
            fore_name: Some(fore_name.to_string()),
            last_name: Some(last_name.to_string()),
        }
    }

    /// `"{fore} {last}"`, only when both parts are present.
    pub fn full_name(&self) -> Option<String> {
        match (&self.fore_name, &self.last_name) {
            (Some(fore), Some(last)) => Some(format!("{} {}", fore, last)),
            _ => None,
        }
    }
}

/// Reduce an author list to the digest's one-line summary.
///
/// Incomplete names are dropped. More than two names render as
/// `"first, second, et al."`; otherwise they are comma-joined.
pub fn summarize_authors(authors: &[AuthorName]) -> String {
    let names: Vec<String> = authors.iter().filter_map(AuthorName::full_name).collect();
    if names.len() > 2 {
        format!("{}, {}, et al.", names[0], names[1])
    } else {
        names.join(", ")
    }
}
