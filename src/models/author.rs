//! Author model shared by every search engine.

use serde::{Deserialize, Deserializer, Serialize};

use super::{normalize_whitespace, RecordError};

/// An author of a paper as reported by a search engine.
///
/// Identifiers are opaque strings captured verbatim from the source; none of
/// them is validated against an external registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Display name, whitespace-collapsed and never empty
    #[serde(deserialize_with = "deserialize_full_name")]
    pub full_name: String,

    /// Google Scholar profile id (the `user=` parameter of a profile link)
    pub google_scholar_id: Option<String>,

    /// DBLP person id
    pub dblp_id: Option<String>,

    /// ORCID iD
    pub orcid_id: Option<String>,

    /// Affiliation text
    pub affiliation: Option<String>,

    /// Personal homepage
    pub homepage: Option<String>,
}

impl Author {
    /// Create an author from a display name.
    ///
    /// Leading, trailing and repeated inner whitespace (including non-breaking
    /// spaces) is collapsed. A name that is blank after normalization is
    /// rejected.
    pub fn new(full_name: impl AsRef<str>) -> Result<Self, RecordError> {
        let full_name = normalize_whitespace(full_name.as_ref());
        if full_name.is_empty() {
            return Err(RecordError::EmptyField("full_name"));
        }

        Ok(Self {
            full_name,
            google_scholar_id: None,
            dblp_id: None,
            orcid_id: None,
            affiliation: None,
            homepage: None,
        })
    }

    /// Set the Google Scholar profile id
    pub fn google_scholar_id(mut self, id: impl Into<String>) -> Self {
        self.google_scholar_id = Some(id.into());
        self
    }

    /// Set the DBLP id
    pub fn dblp_id(mut self, id: impl Into<String>) -> Self {
        self.dblp_id = Some(id.into());
        self
    }

    /// Set the ORCID iD
    pub fn orcid_id(mut self, id: impl Into<String>) -> Self {
        self.orcid_id = Some(id.into());
        self
    }

    /// Set the affiliation
    pub fn affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    /// Set the homepage
    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    /// Canonical ordered mapping of this author, absent fields as `null`
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "full_name": self.full_name,
            "google_scholar_id": self.google_scholar_id,
            "dblp_id": self.dblp_id,
            "orcid_id": self.orcid_id,
            "affiliation": self.affiliation,
            "homepage": self.homepage,
        })
    }

    /// JSON text form of [`Author::to_value`]
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Parse an author from its JSON text form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

fn deserialize_full_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let name = normalize_whitespace(&raw);
    if name.is_empty() {
        return Err(serde::de::Error::custom("author full_name must not be empty"));
    }
    Ok(name)
}
