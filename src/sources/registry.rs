//! Registry for managing search engines.

use std::collections::HashMap;
use std::sync::Arc;

use super::{SearchEngine, SourceError};
use crate::config::Config;

bitflags::bitflags! {
    /// Query parameters and extras an engine supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const YEAR_FILTER = 1 << 1;
        const PAGINATION = 1 << 2;
        const LIMIT = 1 << 3;
        const OPEN_ACCESS = 1 << 4;
        const CITATIONS = 1 << 5;
    }
}

/// Registry of the available search engines, keyed by engine id
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    engines: HashMap<String, Arc<dyn SearchEngine>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every compiled-in engine, configured from `config`
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "source-google_scholar")]
        registry.register(Arc::new(super::GoogleScholarEngine::from_config(config)?));

        #[cfg(feature = "source-semantic")]
        registry.register(Arc::new(super::SemanticScholarEngine::from_config(config)?));

        #[cfg(not(any(feature = "source-google_scholar", feature = "source-semantic")))]
        let _ = config;

        Ok(registry)
    }

    /// Register an engine, replacing any engine with the same id
    pub fn register(&mut self, engine: Arc<dyn SearchEngine>) {
        self.engines.insert(engine.id().to_string(), engine);
    }

    /// Get an engine by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn SearchEngine>> {
        self.engines.get(id)
    }

    /// Get an engine by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn SearchEngine>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::InvalidRequest(format!("Engine '{}' not found", id)))
    }

    /// Get all registered engines
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn SearchEngine>> {
        self.engines.values()
    }

    /// Get all engine IDs, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.engines.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Get engines that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn SearchEngine>> {
        self.all()
            .filter(|e| e.capabilities().contains(capability))
            .collect()
    }

    /// Check if an engine exists
    pub fn has(&self, id: &str) -> bool {
        self.engines.contains_key(id)
    }

    /// Get the number of registered engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
