//! Response parser.
//!
//! Recovers per-domain answer text from a single blob of model output. The
//! blob carries a `BEGIN AIQ-X RESPONSES` / `END AIQ-X RESPONSES` envelope and
//! introduces each domain's answer with a `[[domain-id]]` marker.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AiqError, Marker, Result};
use crate::ordered::OrderedMap;

/// Opening delimiter of the graded section.
pub const START_MARKER: &str = "BEGIN AIQ-X RESPONSES";
/// Closing delimiter of the graded section.
pub const END_MARKER: &str = "END AIQ-X RESPONSES";

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("domain marker regex is valid"));

/// Matches a `[[domain-id]]` marker; group 1 is the bracket interior.
pub(crate) fn marker_regex() -> &'static Regex {
    &MARKER_RE
}

/// The first marker on `line`: its trimmed id and the trimmed text after it.
fn split_marker(line: &str) -> Option<(&str, &str)> {
    let caps = MARKER_RE.captures(line)?;
    let whole = caps.get(0)?;
    let id = caps.get(1)?;
    Some((id.as_str().trim(), line[whole.end()..].trim()))
}

/// Per-domain answer text, in the order domains first appear in the blob.
pub type Sections = OrderedMap<String>;

/// Extract each domain's answer from `raw_text`.
///
/// The **last** start marker is used so that prompts echoed back by the model
/// are skipped; the end marker is the first one after it. Every id in
/// `expected_domains` is present in the result, with an empty string when the
/// blob never mentions it.
pub fn parse_response<S: AsRef<str>>(raw_text: &str, expected_domains: &[S]) -> Result<Sections> {
    let start = raw_text
        .rfind(START_MARKER)
        .ok_or(AiqError::MarkerNotFound(Marker::Start))?;
    let body_start = start + START_MARKER.len();
    let end = raw_text[start..]
        .find(END_MARKER)
        .map(|offset| start + offset)
        .ok_or(AiqError::MarkerNotFound(Marker::End))?;

    let content = raw_text[body_start..end].trim();

    let mut sections = Sections::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        if let Some((domain, rest)) = split_marker(line) {
            // A repeated marker restarts that domain's text.
            sections.insert(domain, rest.to_string());
            current = Some(domain.to_string());
        } else if let Some(domain) = &current {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(text) = sections.get_mut(domain) {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(line);
            }
        }
    }

    for text in sections.values_mut() {
        let trimmed = text.trim();
        if trimmed.len() != text.len() {
            *text = trimmed.to_string();
        }
    }

    for domain in expected_domains {
        let domain = domain.as_ref();
        if !sections.contains_key(domain) {
            sections.insert(domain, String::new());
        }
    }

    tracing::debug!(
        sections = sections.len(),
        expected = expected_domains.len(),
        "parsed response"
    );
    Ok(sections)
}
