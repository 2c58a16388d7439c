/// Turn a scholar anchor title into a PubMed search query.
///
/// Drops ellipsis markers (`…` and `...`), keeps only the text before the
/// first colon, and trims. The result may be empty.
pub fn clean_title_for_search(title: &str) -> String {
    let without_ellipsis = title.replace('…', "").replace("...", "");
    let head = match without_ellipsis.split_once(':') {
        Some((head, _)) => head,
        None => without_ellipsis.as_str(),
    };
    head.trim().to_string()
}
