//! Per-card extraction: title, citation count, layout detection and the
//! layout-specific field rules.

use std::sync::LazyLock;

use scraper::{ElementRef, Node, Selector};

use super::text::{
    normalize_whitespace, parse_author_id, parse_citation_count, split_author_names,
    split_authors_venue_year, split_venue_year,
};
use super::ExtractError;
use crate::models::{Author, PaperBuilder, PaperSearchResult};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_ri > h3 > a"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static OPEN_ACCESS_LINK: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_ggs a[href]"));

static COMPACT_MARKER: LazyLock<Selector> =
    LazyLock::new(|| selector("div.gs_a:not(.gs_fma_p)"));
static COMPACT_SNIPPET: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_rs"));

static DETAILED_MARKER: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_fmaa"));
static DETAILED_VENUE: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_a.gs_fma_p"));
static DETAILED_SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| selector("div.gs_fma_abs div.gs_fma_snp"));

/// The two result-card templates the upstream renders.
///
/// Detailed cards are shown for entries with structured author metadata
/// (linked profiles, separate venue line); every other entry gets a compact
/// card with a single free-text author/venue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardLayout {
    Detailed,
    Compact,
}

/// Fields whose location depends on the card layout
#[derive(Debug, Default)]
struct LayoutFields {
    authors: Vec<Author>,
    venue_name: Option<String>,
    venue_url: Option<String>,
    year: Option<i32>,
    abstract_text: Option<String>,
}

impl CardLayout {
    /// Decide which template a card uses.
    ///
    /// A card with neither marker means the extraction rules no longer match
    /// the upstream markup.
    pub fn detect(card: &ElementRef<'_>) -> Result<Self, ExtractError> {
        let compact = card.select(&COMPACT_MARKER).next().is_some();
        let detailed = card.select(&DETAILED_MARKER).next().is_some();

        match (compact, detailed) {
            (true, false) => Ok(CardLayout::Compact),
            (false, true) => Ok(CardLayout::Detailed),
            (true, true) => {
                tracing::debug!("Card carries both layout markers, using compact rules");
                Ok(CardLayout::Compact)
            }
            (false, false) => Err(ExtractError::StructureNotFound(
                "result card has neither a compact nor a detailed author block".to_string(),
            )),
        }
    }

    fn extract(self, card: &ElementRef<'_>) -> LayoutFields {
        match self {
            CardLayout::Detailed => extract_detailed(card),
            CardLayout::Compact => extract_compact(card),
        }
    }
}

/// Extract one card.
///
/// Returns `Ok(None)` for cards without a title link, which are not papers
/// (citation-only entries, pagination blocks and similar noise).
pub fn extract_card(card: &ElementRef<'_>) -> Result<Option<PaperSearchResult>, ExtractError> {
    let Some(title) = extract_title(card) else {
        tracing::debug!("Skipping result card without a title link");
        return Ok(None);
    };

    let citation_count = extract_citation_count(card);
    let layout = CardLayout::detect(card)?;
    let fields = layout.extract(card);

    let mut builder = PaperBuilder::new(&title)
        .authors(fields.authors)
        .year(fields.year)
        .abstract_text(fields.abstract_text)
        .citation_count(citation_count)
        .venue_name(fields.venue_name)
        .venue_url(fields.venue_url);

    if let Some(link) = extract_open_access_link(card) {
        builder = builder.open_access(Some(link));
    }

    // title is non-empty here, so build cannot fail
    Ok(builder.build().ok())
}

fn extract_title(card: &ElementRef<'_>) -> Option<String> {
    card.select(&TITLE)
        .next()
        .map(|a| normalize_whitespace(&a.text().collect::<String>()))
        .filter(|title| !title.is_empty())
}

/// A card without a "Cited by" link reports zero citations; a link whose
/// number cannot be read reports an unknown count.
fn extract_citation_count(card: &ElementRef<'_>) -> Option<u32> {
    card.select(&LINKS)
        .find_map(|a| parse_citation_count(&a.text().collect::<String>()))
        .unwrap_or(Some(0))
}

fn extract_open_access_link(card: &ElementRef<'_>) -> Option<String> {
    card.select(&OPEN_ACCESS_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn snippet(card: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

fn extract_detailed(card: &ElementRef<'_>) -> LayoutFields {
    let mut fields = LayoutFields {
        abstract_text: snippet(card, &DETAILED_SNIPPET),
        ..Default::default()
    };

    if let Some(venue) = card.select(&DETAILED_VENUE).next() {
        let mut lines = venue
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| normalize_whitespace(text))
            .filter(|text| !text.is_empty());

        if let Some(packed) = lines.next() {
            let (venue_name, year) = split_venue_year(&packed);
            fields.venue_name = venue_name;
            fields.year = year;
        }
        fields.venue_url = lines.next();
    }

    if let Some(block) = card.select(&DETAILED_MARKER).next() {
        fields.authors = detailed_authors(&block);
    }

    fields
}

/// Authors of a detailed card: linked entries carry a profile id, plain
/// comma-separated text yields names only.
fn detailed_authors(block: &ElementRef<'_>) -> Vec<Author> {
    let mut authors = Vec::new();

    for node in block.children() {
        match node.value() {
            Node::Element(el) if el.name() == "a" => {
                let Some(link) = ElementRef::wrap(node) else {
                    continue;
                };
                let Ok(author) = Author::new(link.text().collect::<String>()) else {
                    continue;
                };
                let author = match el.attr("href").and_then(parse_author_id) {
                    Some(id) => author.google_scholar_id(id),
                    None => author,
                };
                authors.push(author);
            }
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(node) {
                    authors.extend(names_only(&el.text().collect::<String>()));
                }
            }
            Node::Text(text) => authors.extend(names_only(text)),
            _ => {}
        }
    }

    authors
}

fn names_only(text: &str) -> Vec<Author> {
    split_author_names(text)
        .into_iter()
        .filter_map(|name| Author::new(name).ok())
        .collect()
}

fn extract_compact(card: &ElementRef<'_>) -> LayoutFields {
    let abstract_text = snippet(card, &COMPACT_SNIPPET);

    let Some(line) = card.select(&COMPACT_MARKER).next() else {
        return LayoutFields {
            abstract_text,
            ..Default::default()
        };
    };

    let parts = split_authors_venue_year(&line.text().collect::<String>());
    LayoutFields {
        authors: parts
            .authors
            .into_iter()
            .filter_map(|name| Author::new(name).ok())
            .collect(),
        venue_name: parts.venue_name,
        venue_url: parts.venue_url,
        year: parts.year,
        abstract_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn with_card<T>(html: &str, f: impl FnOnce(&ElementRef<'_>) -> T) -> T {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("div.gs_r").unwrap();
        let card = doc.select(&sel).next().expect("fixture has a card");
        f(&card)
    }

    const DETAILED: &str = r#"
        <div class="gs_r gs_or gs_scl">
          <div class="gs_ggs gs_fl"><a href="https://arxiv.org/pdf/1706.03762">[PDF] arxiv.org</a></div>
          <div class="gs_ri">
            <h3 class="gs_rt"><a href="https://arxiv.org/abs/1706.03762">Attention is  all you need</a></h3>
            <div class="gs_fmaa"><a href="/citations?user=AB12cd34&amp;hl=en&amp;oi=sra">A Vaswani</a>, N Shazeer, <a href="/citations?hl=en">N Parmar</a></div>
            <div class="gs_a gs_fma_p">Advances in neural information&nbsp;processing systems, 2017<br>proceedings.neurips.cc</div>
            <div class="gs_fma_abs"><div class="gs_fma_snp">The dominant sequence transduction models are based on recurrent networks.</div></div>
            <div class="gs_fl"><a href="/scholar?cites=1">Cited by 123456</a> <a href="/scholar?related">Related articles</a></div>
          </div>
        </div>"#;

    const COMPACT: &str = r#"
        <div class="gs_r gs_or gs_scl">
          <div class="gs_ri">
            <h3 class="gs_rt"><a href="https://example.org/paper">Widgets considered harmful</a></h3>
            <div class="gs_a">A. Smith, <a href="/citations?user=QQ">B. Lee</a>&nbsp;- Journal of Widgets, 2019&nbsp;- example.org/paper</div>
            <div class="gs_rs">We study widgets
              in depth.</div>
          </div>
        </div>"#;

    #[test]
    fn test_detect_layouts() {
        assert_eq!(with_card(DETAILED, CardLayout::detect), Ok(CardLayout::Detailed));
        assert_eq!(with_card(COMPACT, CardLayout::detect), Ok(CardLayout::Compact));
    }

    #[test]
    fn test_detect_neither_marker() {
        let html = r#"<div class="gs_r"><div class="gs_ri"><h3><a href="x">T</a></h3></div></div>"#;
        assert!(matches!(
            with_card(html, CardLayout::detect),
            Err(ExtractError::StructureNotFound(_))
        ));
    }

    #[test]
    fn test_detailed_card() {
        let paper = with_card(DETAILED, extract_card).unwrap().unwrap();

        assert_eq!(paper.title, "Attention is all you need");
        assert_eq!(paper.author_names(), vec!["A Vaswani", "N Shazeer", "N Parmar"]);
        assert_eq!(paper.authors[0].google_scholar_id.as_deref(), Some("AB12cd34"));
        assert_eq!(paper.authors[1].google_scholar_id, None);
        assert_eq!(paper.authors[2].google_scholar_id, None);
        assert_eq!(
            paper.venue_name.as_deref(),
            Some("Advances in neural information processing systems")
        );
        assert_eq!(paper.year, Some(2017));
        assert_eq!(paper.venue_url.as_deref(), Some("proceedings.neurips.cc"));
        assert_eq!(paper.citation_count, Some(123456));
        assert!(paper.r#abstract.unwrap().starts_with("The dominant sequence"));
        assert_eq!(paper.is_open_access, Some(true));
        assert_eq!(
            paper.open_access_link.as_deref(),
            Some("https://arxiv.org/pdf/1706.03762")
        );
    }

    #[test]
    fn test_compact_card() {
        let paper = with_card(COMPACT, extract_card).unwrap().unwrap();

        assert_eq!(paper.title, "Widgets considered harmful");
        assert_eq!(paper.author_names(), vec!["A. Smith", "B. Lee"]);
        assert!(paper.authors.iter().all(|a| a.google_scholar_id.is_none()));
        assert_eq!(paper.venue_name.as_deref(), Some("Journal of Widgets"));
        assert_eq!(paper.year, Some(2019));
        assert_eq!(paper.venue_url.as_deref(), Some("example.org/paper"));
        assert_eq!(paper.r#abstract.as_deref(), Some("We study widgets in depth."));
        assert_eq!(paper.is_open_access, None);
    }

    #[test]
    fn test_missing_cited_by_is_zero() {
        let paper = with_card(COMPACT, extract_card).unwrap().unwrap();
        assert_eq!(paper.citation_count, Some(0));
    }

    #[test]
    fn test_unreadable_cited_by_is_unknown() {
        let html = COMPACT.replace(
            r#"<div class="gs_rs">"#,
            r#"<div class="gs_fl"><a href="/c">Cited by lots</a></div><div class="gs_rs">"#,
        );
        let paper = with_card(&html, extract_card).unwrap().unwrap();
        assert_eq!(paper.citation_count, None);
    }

    #[test]
    fn test_bad_year_keeps_card() {
        let html = COMPACT.replace("2019", "20l9");
        let paper = with_card(&html, extract_card).unwrap().unwrap();
        assert_eq!(paper.year, None);
        assert_eq!(paper.title, "Widgets considered harmful");
        assert_eq!(paper.venue_name.as_deref(), Some("Journal of Widgets, 20l9"));
    }

    #[test]
    fn test_card_without_title_is_skipped() {
        let html = r#"
            <div class="gs_r"><div class="gs_ri">
              <h3 class="gs_rt"><span class="gs_ct1">[CITATION]</span> A citation-only entry</h3>
              <div class="gs_a">X Author - Somewhere, 2001 - host.org</div>
            </div></div>"#;
        assert_eq!(with_card(html, extract_card), Ok(None));
    }

    #[test]
    fn test_detailed_author_link_without_user_param() {
        let paper = with_card(DETAILED, extract_card).unwrap().unwrap();
        let parmar = paper.authors.iter().find(|a| a.full_name == "N Parmar").unwrap();
        assert_eq!(parmar.google_scholar_id, None);
    }
}
