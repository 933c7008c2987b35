//! Search engines with a shared trait-based contract.
//!
//! This module defines the [`SearchEngine`] trait that every backend
//! implements. Engines can be used directly or through the
//! [`SourceRegistry`], which is built from the configuration and only
//! contains the engines compiled in.
//!
//! # Feature Flags
//!
//! - `google_scholar` - Google Scholar results-page engine (default: enabled)
//! - `semantic` - Semantic Scholar Graph API engine (default: enabled)
//!
//! # Errors
//!
//! All engines report failures through [`SourceError`]. Callers deciding
//! whether to retry should use [`SourceError::is_retryable`]: a blocked or
//! empty response is worth retrying later (ideally from another egress
//! address), a missing markup structure is not.

#[cfg(feature = "source-google_scholar")]
mod google_scholar;
mod registry;
#[cfg(feature = "source-semantic")]
mod semantic;

pub mod mock;

pub use mock::MockEngine;

#[cfg(feature = "source-google_scholar")]
pub use google_scholar::{GoogleScholarEngine, RESULTS_PER_PAGE};
pub use registry::{SourceCapabilities, SourceRegistry};
#[cfg(feature = "source-semantic")]
pub use semantic::SemanticScholarEngine;

use std::time::Duration;

use async_trait::async_trait;

use crate::markup::ExtractError;
use crate::models::{PaperSearchResult, SearchQuery};

/// The SearchEngine trait is the only surface consumers use.
///
/// # Implementing a New Engine
///
/// 1. Create a struct that implements `SearchEngine`
/// 2. Implement `id`, `name` and `search`; override `capabilities` to
///    describe which query parameters the backend honors
/// 3. Add the engine to `SourceRegistry::from_config` or register it
///    dynamically
///
/// Parameters an engine cannot honor must not fail the call: `limit` is
/// reported with a `tracing::warn!` and the natural page size is returned.
#[async_trait]
pub trait SearchEngine: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this engine (e.g. "google_scholar", "semantic")
    fn id(&self) -> &str;

    /// Human-readable name of this engine
    fn name(&self) -> &str;

    /// Describe which query parameters this engine honors
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Whether this engine can cap the number of returned results
    fn supports_limit(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::LIMIT)
    }

    /// Search for papers matching the query, in the backend's relevance order.
    ///
    /// Zero hits is `Ok(vec![])`, never an error.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperSearchResult>, SourceError>;
}

/// Errors that can occur when searching a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The upstream actively refused service (automated-traffic page)
    #[error("Blocked by source: {0}")]
    BlockedBySource(String),

    /// An expected markup anchor or layout marker is missing
    #[error("Expected structure not found: {0}")]
    StructureNotFound(String),

    /// The fetch succeeded but returned no content
    #[error("Source returned an empty response")]
    EmptyResponse,

    /// No egress address could be obtained for the request
    #[error("No egress address available: {0}")]
    EgressUnavailable(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, URL, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit {
        /// Server-suggested wait before the next attempt
        retry_after: Option<Duration>,
    },

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether the caller may reasonably retry the same search later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::BlockedBySource(_)
                | SourceError::EmptyResponse
                | SourceError::Network(_)
                | SourceError::RateLimit { .. }
        )
    }
}

impl From<ExtractError> for SourceError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Blocked => {
                SourceError::BlockedBySource("automated-traffic page returned".to_string())
            }
            ExtractError::StructureNotFound(what) => SourceError::StructureNotFound(what),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::Parse(format!("URL: {}", err))
    }
}
