//! Mock engine for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{PaperSearchResult, SearchQuery};
use crate::sources::{SearchEngine, SourceCapabilities, SourceError};

/// A mock engine that returns predefined results and records every query.
#[derive(Debug, Default)]
pub struct MockEngine {
    results: Mutex<Vec<PaperSearchResult>>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl MockEngine {
    /// Create a new mock engine that returns no results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock engine returning `results` for every search.
    pub fn with_results(results: Vec<PaperSearchResult>) -> Self {
        let engine = Self::new();
        engine.set_results(results);
        engine
    }

    /// Set the results to return.
    pub fn set_results(&self, results: Vec<PaperSearchResult>) {
        let mut guard = self.results.lock().unwrap_or_else(|e| e.into_inner());
        *guard = results;
    }

    /// Queries received so far, oldest first.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SearchEngine for MockEngine {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Engine"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LIMIT
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperSearchResult>, SourceError> {
        query.validate()?;
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());

        let results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        let skip = query.offset_or_default();
        let take = query.limit.unwrap_or(usize::MAX);
        Ok(results.iter().skip(skip).take(take).cloned().collect())
    }
}
