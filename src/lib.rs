//! # Scholar Harvest
//!
//! Normalized bibliographic records from academic search backends: Google
//! Scholar results pages and the Semantic Scholar Graph API.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PaperSearchResult, Author, SearchQuery)
//! - [`sources`]: Search engines behind the [`SearchEngine`] trait, plus the registry
//! - [`markup`]: Extraction of records from Google Scholar results markup
//! - [`fetch`]: Page fetching and egress rotation collaborators
//! - [`utils`]: HTTP client and retry utilities
//! - [`config`]: Configuration management

pub mod config;
pub mod fetch;
pub mod markup;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Author, PaperSearchResult, SearchQuery};
pub use sources::{SearchEngine, SourceError, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
