use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LIST_MARKER_RE: Regex = Regex::new(r#"^(?:[-*•]|\d+[.)])\s+"#).unwrap();
}

/// Splits a reply into trimmed, non-empty lines.
pub fn non_empty_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [non_empty_lines] but also drops list markers (`1.`, `2)`, `-`, `*`) and surrounding quotes,
/// which models like to add even when asked for bare lines.
pub fn list_items(reply: &str) -> Vec<String> {
    non_empty_lines(reply)
        .into_iter()
        .map(|line| {
            let item = LIST_MARKER_RE.replace(&line, "");
            item.trim().trim_matches('"').trim().to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}
