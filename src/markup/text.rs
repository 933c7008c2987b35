//! Free-text splitting rules for Google Scholar result cards.
//!
//! These are the fragile parts of extraction: every rule that depends on how
//! the upstream packs several fields into one line of text lives here, as a
//! pure function, so it can be adjusted without touching tree traversal.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

pub use crate::models::normalize_whitespace;

/// Separator between the author, venue and host segments of a compact card
const SEGMENT_SEPARATOR: &str = " - ";

/// Base used to resolve relative author profile links
const PROFILE_BASE: &str = "https://scholar.google.com/";

static CITED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Cited by\s+(\S+)").expect("valid cited-by pattern"));

/// Fields packed into the single author line of a compact card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorVenueLine {
    pub authors: Vec<String>,
    pub venue_name: Option<String>,
    pub year: Option<i32>,
    pub venue_url: Option<String>,
}

/// Parse a publication year: exactly four ASCII digits, surrounding
/// whitespace ignored.
pub fn parse_year(text: &str) -> Option<i32> {
    let text = normalize_whitespace(text);
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

/// Split `"<venue>, <year>"` on its last comma.
///
/// - `"Journal of Widgets, 2019"` gives `(Some("Journal of Widgets"), Some(2019))`
/// - `"2019"` gives `(None, Some(2019))`
/// - `"Nature"` gives `(Some("Nature"), None)`
/// - when the text after the last comma is not a year, the whole text is
///   kept as the venue and the year is absent
pub fn split_venue_year(text: &str) -> (Option<String>, Option<i32>) {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return (None, None);
    }

    if let Some((venue, tail)) = text.rsplit_once(',') {
        if let Some(year) = parse_year(tail) {
            let venue = normalize_whitespace(venue);
            return ((!venue.is_empty()).then_some(venue), Some(year));
        }
        return (Some(text), None);
    }

    match parse_year(&text) {
        Some(year) => (None, Some(year)),
        None => (Some(text), None),
    }
}

/// Split a comma-separated author list into trimmed names.
///
/// Truncation markers (`…`) that the upstream appends to long lists are
/// dropped, as are empty entries.
pub fn split_author_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(|name| normalize_whitespace(name.trim().trim_end_matches('…')))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Split the compact-card line `"<authors> - <venue>, <year> - <host>"`.
///
/// Non-breaking spaces are normalized before splitting on `" - "`, so
/// hyphenated names and venues stay intact. With fewer than three segments
/// only the authors are taken; venue, year and URL stay absent rather than
/// being assigned to the wrong field.
pub fn split_authors_venue_year(text: &str) -> AuthorVenueLine {
    let text = normalize_whitespace(text);
    let segments: Vec<&str> = text.split(SEGMENT_SEPARATOR).collect();

    let authors = segments
        .first()
        .map(|first| split_author_names(first))
        .unwrap_or_default();

    if segments.len() < 3 {
        return AuthorVenueLine {
            authors,
            ..Default::default()
        };
    }

    let (venue_name, year) = split_venue_year(segments[segments.len() - 2]);
    let venue_url = normalize_whitespace(segments[segments.len() - 1]);

    AuthorVenueLine {
        authors,
        venue_name,
        year,
        venue_url: (!venue_url.is_empty()).then_some(venue_url),
    }
}

/// Extract the Scholar profile id from an author link target
/// (`/citations?user=<id>&hl=en`). Relative and absolute links are accepted.
pub fn parse_author_id(href: &str) -> Option<String> {
    let base = Url::parse(PROFILE_BASE).ok()?;
    let url = base.join(href.trim()).ok()?;

    url.query_pairs()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Parse the text of a "Cited by N" link.
///
/// Returns `None` when the text is not a cited-by link at all,
/// `Some(None)` when it is but the number cannot be read, and
/// `Some(Some(n))` otherwise.
pub fn parse_citation_count(text: &str) -> Option<Option<u32>> {
    let text = normalize_whitespace(text);
    if !text.starts_with("Cited by") {
        return None;
    }

    let count = CITED_BY
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<u32>().ok());
    Some(count)
}
