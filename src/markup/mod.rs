//! Extraction of paper records from a Google Scholar results page.
//!
//! The page has no stable schema, so extraction runs in stages:
//!
//! 1. locate the results container by its id, telling a blocking page apart
//!    from a markup change when it is missing,
//! 2. walk the container's direct children as result cards,
//! 3. per card, read the title and citation count, detect the
//!    [`CardLayout`], and apply that layout's field rules.
//!
//! Everything here is synchronous and pure: it reads the document it is given
//! and allocates new records, so it can be called from any number of tasks
//! at once.

mod card;
pub mod text;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::PaperSearchResult;

pub use card::{extract_card, CardLayout};

/// Id of the node that holds all result cards
pub const RESULTS_CONTAINER_ID: &str = "gs_res_ccl_mid";

/// Text fragments that only appear on the upstream's automated-traffic page
pub const BLOCKING_MARKERS: &[&str] = &[
    "not a robot",
    "unusual traffic from your computer network",
];

static CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("#{}", RESULTS_CONTAINER_ID)).expect("static selector is valid")
});
static CAPTCHA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#gs_captcha_ccl, #recaptcha").expect("static selector is valid"));

/// Reasons a results page could not be turned into records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The page is the upstream's automated-traffic block
    #[error("source is blocking automated requests")]
    Blocked,

    /// An anchor or layout marker the extraction rules rely on is missing
    #[error("expected markup not found: {0}")]
    StructureNotFound(String),
}

/// Extract all paper records from one results page, in document order.
///
/// A page whose container exists but holds no usable cards yields an empty
/// vector. Cards without a title are skipped; fields that cannot be coerced
/// are left absent without discarding the card.
pub fn extract_results(html: &str) -> Result<Vec<PaperSearchResult>, ExtractError> {
    let document = Html::parse_document(html);

    let Some(container) = document.select(&CONTAINER).next() else {
        if has_blocking_marker(html, &document) {
            return Err(ExtractError::Blocked);
        }
        return Err(ExtractError::StructureNotFound(format!(
            "results container #{} is missing",
            RESULTS_CONTAINER_ID
        )));
    };

    let mut results = Vec::new();
    for card in result_cards(&container) {
        if let Some(paper) = extract_card(&card)? {
            results.push(paper);
        }
    }

    tracing::debug!("Extracted {} records from results page", results.len());
    Ok(results)
}

/// Direct `div` children of the results container
fn result_cards<'a>(container: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    container
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "div")
}

/// Whether a response body is the upstream's automated-traffic page.
///
/// Applies to any response, including ones served with an error status.
pub fn is_blocking_page(html: &str) -> bool {
    has_blocking_marker(html, &Html::parse_document(html))
}

fn has_blocking_marker(raw: &str, document: &Html) -> bool {
    BLOCKING_MARKERS.iter().any(|marker| raw.contains(marker))
        || document.select(&CAPTCHA).next().is_some()
}
