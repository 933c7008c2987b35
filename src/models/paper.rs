//! Paper model representing one search hit from any engine.

use serde::{Deserialize, Serialize};

use super::{normalize_whitespace, Author, RecordError};

/// A paper returned by a search engine, normalized across sources.
///
/// Values are built once through [`PaperBuilder`] and never mutated
/// afterwards. Absence and zero are distinct for `citation_count`: `None`
/// means the engine could not tell, `Some(0)` means zero was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaperRecord")]
pub struct PaperSearchResult {
    /// Paper title, whitespace-normalized
    pub title: String,

    /// Authors in source order (empty when the source lists none)
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Publication year
    pub year: Option<i32>,

    /// Abstract or snippet text
    pub r#abstract: Option<String>,

    /// Citation count
    pub citation_count: Option<u32>,

    /// Venue (journal, conference, repository) name
    pub venue_name: Option<String>,

    /// Venue or landing page URL
    pub venue_url: Option<String>,

    /// Open-access status, `None` when unknown
    pub is_open_access: Option<bool>,

    /// Link to a retrievable full-text artifact, only set for open-access papers
    pub open_access_link: Option<String>,
}

impl PaperSearchResult {
    /// Start building a result with the given title
    pub fn builder(title: impl AsRef<str>) -> PaperBuilder {
        PaperBuilder::new(title)
    }

    /// Returns the author names in order
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.full_name.as_str()).collect()
    }

    /// Check if the paper has a full-text link
    pub fn has_open_access_link(&self) -> bool {
        self.open_access_link.is_some()
    }

    /// Canonical ordered mapping of this result, absent fields as `null`
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "authors": self.authors.iter().map(Author::to_value).collect::<Vec<_>>(),
            "year": self.year,
            "abstract": self.r#abstract,
            "citation_count": self.citation_count,
            "venue_name": self.venue_name,
            "venue_url": self.venue_url,
            "is_open_access": self.is_open_access,
            "open_access_link": self.open_access_link,
        })
    }

    /// JSON text form of [`PaperSearchResult::to_value`]
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Parse a result from its JSON text form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Builder for constructing [`PaperSearchResult`] values
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    title: String,
    authors: Vec<Author>,
    year: Option<i32>,
    r#abstract: Option<String>,
    citation_count: Option<u32>,
    venue_name: Option<String>,
    venue_url: Option<String>,
    is_open_access: Option<bool>,
    open_access_link: Option<String>,
}

impl PaperBuilder {
    /// Create a new builder; the title is normalized immediately
    pub fn new(title: impl AsRef<str>) -> Self {
        Self {
            title: normalize_whitespace(title.as_ref()),
            authors: Vec::new(),
            year: None,
            r#abstract: None,
            citation_count: None,
            venue_name: None,
            venue_url: None,
            is_open_access: None,
            open_access_link: None,
        }
    }

    /// Set authors
    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.authors = authors;
        self
    }

    /// Add a single author
    pub fn author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    /// Set year
    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Set abstract; blank text is treated as absent
    pub fn abstract_text(mut self, text: Option<String>) -> Self {
        self.r#abstract = text.filter(|t| !t.trim().is_empty());
        self
    }

    /// Set citation count
    pub fn citation_count(mut self, count: Option<u32>) -> Self {
        self.citation_count = count;
        self
    }

    /// Set venue name; blank text is treated as absent
    pub fn venue_name(mut self, name: Option<String>) -> Self {
        self.venue_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// Set venue URL; blank text is treated as absent
    pub fn venue_url(mut self, url: Option<String>) -> Self {
        self.venue_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Mark the paper open access, optionally with a full-text link
    pub fn open_access(mut self, link: Option<String>) -> Self {
        self.is_open_access = Some(true);
        self.open_access_link = link.filter(|l| !l.trim().is_empty());
        self
    }

    /// Mark the paper as not open access
    pub fn closed_access(mut self) -> Self {
        self.is_open_access = Some(false);
        self.open_access_link = None;
        self
    }

    /// Build the result, rejecting an empty title
    pub fn build(self) -> Result<PaperSearchResult, RecordError> {
        if self.title.is_empty() {
            return Err(RecordError::EmptyField("title"));
        }

        Ok(PaperSearchResult {
            title: self.title,
            authors: self.authors,
            year: self.year,
            r#abstract: self.r#abstract,
            citation_count: self.citation_count,
            venue_name: self.venue_name,
            venue_url: self.venue_url,
            is_open_access: self.is_open_access,
            open_access_link: self.open_access_link,
        })
    }
}

/// Wire form of a result; decoded values go back through [`PaperBuilder`]
#[derive(Deserialize)]
struct PaperRecord {
    title: String,
    #[serde(default)]
    authors: Vec<Author>,
    year: Option<i32>,
    r#abstract: Option<String>,
    citation_count: Option<u32>,
    venue_name: Option<String>,
    venue_url: Option<String>,
    is_open_access: Option<bool>,
    open_access_link: Option<String>,
}

impl TryFrom<PaperRecord> for PaperSearchResult {
    type Error = RecordError;

    fn try_from(record: PaperRecord) -> Result<Self, Self::Error> {
        let builder = PaperBuilder::new(&record.title)
            .authors(record.authors)
            .year(record.year)
            .abstract_text(record.r#abstract)
            .citation_count(record.citation_count)
            .venue_name(record.venue_name)
            .venue_url(record.venue_url);

        // a link without a positive open-access flag is dropped
        let builder = match record.is_open_access {
            Some(true) => builder.open_access(record.open_access_link),
            Some(false) => builder.closed_access(),
            None => builder,
        };
        builder.build()
    }
}
