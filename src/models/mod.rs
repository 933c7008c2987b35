//! Core data models for paper records and search requests.

mod author;
mod paper;
mod search;

pub use author::Author;
pub use paper::{PaperBuilder, PaperSearchResult};
pub use search::SearchQuery;

/// Violations of record invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// A required text field was empty after whitespace normalization
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),
}

/// Collapse runs of whitespace (including non-breaking spaces) into single
/// spaces and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
