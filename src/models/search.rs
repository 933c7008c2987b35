//! Search request model.

use serde::{Deserialize, Serialize};

use crate::sources::SourceError;

/// Search query parameters shared by every engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Main search query string; keyword vs phrase semantics are engine-defined
    pub query: String,

    /// Inclusive lower bound on publication year
    pub year_from: Option<i32>,

    /// Inclusive upper bound on publication year
    pub year_to: Option<i32>,

    /// Zero-based number of results to skip
    pub offset: Option<usize>,

    /// Maximum number of results to return
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the lower year bound
    pub fn year_from(mut self, year: i32) -> Self {
        self.year_from = Some(year);
        self
    }

    /// Set the upper year bound
    pub fn year_to(mut self, year: i32) -> Self {
        self.year_to = Some(year);
        self
    }

    /// Set the pagination offset
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the maximum number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Offset with the default of zero applied
    pub fn offset_or_default(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Check the query before it is sent anywhere
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.query.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(SourceError::InvalidRequest(format!(
                    "year_from ({}) is after year_to ({})",
                    from, to
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let query = SearchQuery::new("graph neural networks")
            .year_from(2018)
            .year_to(2022)
            .offset(20)
            .limit(5);

        assert_eq!(query.query, "graph neural networks");
        assert_eq!(query.year_from, Some(2018));
        assert_eq!(query.year_to, Some(2022));
        assert_eq!(query.offset_or_default(), 20);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_offset_defaults_to_zero() {
        assert_eq!(SearchQuery::new("q").offset_or_default(), 0);
    }

    #[test]
    fn test_validate() {
        assert!(SearchQuery::new("transformers").validate().is_ok());
        assert!(SearchQuery::new("   ").validate().is_err());
        assert!(SearchQuery::new("q").year_from(2020).year_to(2019).validate().is_err());
        assert!(SearchQuery::new("q").year_from(2020).year_to(2020).validate().is_ok());
        assert!(SearchQuery::new("q").year_to(1999).validate().is_ok());
    }
}
