//! Google Scholar results-page engine.
//!
//! Google Scholar has no public API, so this engine fetches the results page
//! through an injected [`PageFetcher`] and hands the markup to
//! [`crate::markup::extract_results`]. Every request leaves through a fresh
//! address from the injected [`EgressPool`]; without one the search fails
//! before any request is made.

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::fetch::{
    EgressPool, HttpPageFetcher, PageFetcher, PageRequest, ProxyPoolClient, StaticEgressPool,
};
use crate::markup;
use crate::models::{PaperSearchResult, SearchQuery};
use crate::sources::{SearchEngine, SourceCapabilities, SourceError};
use crate::utils::HttpClient;

const GOOGLE_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Results shown per page by the upstream
pub const RESULTS_PER_PAGE: usize = 10;

/// Opens the citation details of the last result so they are in the markup
const REVEAL_CITATION_SCRIPT: &str = "let buttons = document.querySelectorAll('a.gs_or_cit'); \
     if (buttons.length > 0) {buttons[buttons.length - 1].click();}";

/// Google Scholar search engine
#[derive(Debug, Clone)]
pub struct GoogleScholarEngine {
    fetcher: Arc<dyn PageFetcher>,
    egress: Arc<dyn EgressPool>,
    base_url: String,
    language: String,
}

impl GoogleScholarEngine {
    /// Create an engine with the default base URL and English results
    pub fn new(fetcher: Arc<dyn PageFetcher>, egress: Arc<dyn EgressPool>) -> Self {
        Self {
            fetcher,
            egress,
            base_url: GOOGLE_SCHOLAR_URL.to_string(),
            language: "en".to_string(),
        }
    }

    /// Use a different scheme and host for results pages
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request results in another interface language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Build the engine with an HTTP fetcher and the configured egress source.
    ///
    /// A proxy-pool endpoint takes precedence over the static proxy list.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let settings = &config.google_scholar;

        let fetcher = Arc::new(HttpPageFetcher::new(
            settings.user_agent.clone(),
            config.http.clone(),
        )?);

        let egress: Arc<dyn EgressPool> = match &settings.proxy_pool_url {
            Some(endpoint) => {
                let client = HttpClient::build(
                    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
                    &config.http,
                    None,
                )?;
                Arc::new(ProxyPoolClient::new(client, endpoint.clone()))
            }
            None => Arc::new(StaticEgressPool::parse(&settings.proxies)?),
        };

        Ok(Self::new(fetcher, egress)
            .with_base_url(settings.base_url.clone())
            .with_language(settings.language.clone()))
    }

    /// Build the results-page URL for a query.
    ///
    /// Absent year bounds are omitted rather than sent empty.
    pub fn build_url(&self, query: &SearchQuery) -> Result<String, SourceError> {
        let mut url = Url::parse(&format!("{}/scholar", self.base_url.trim_end_matches('/')))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("hl", &self.language)
                .append_pair("as_sdt", "0,5")
                .append_pair("q", &query.query)
                .append_pair("start", &query.offset_or_default().to_string());
            if let Some(year) = query.year_from {
                pairs.append_pair("as_ylo", &year.to_string());
            }
            if let Some(year) = query.year_to {
                pairs.append_pair("as_yhi", &year.to_string());
            }
        }

        Ok(url.into())
    }

    /// Search by 1-based page number instead of a raw offset
    pub async fn search_page(
        &self,
        query: &SearchQuery,
        page: usize,
    ) -> Result<Vec<PaperSearchResult>, SourceError> {
        if page == 0 {
            return Err(SourceError::InvalidRequest(
                "page numbers start at 1".to_string(),
            ));
        }

        let offset = (page - 1).checked_mul(RESULTS_PER_PAGE).ok_or_else(|| {
            SourceError::InvalidRequest(format!("page {} is out of range", page))
        })?;
        self.search(&query.clone().offset(offset)).await
    }
}

#[async_trait]
impl SearchEngine for GoogleScholarEngine {
    fn id(&self) -> &str {
        "google_scholar"
    }

    fn name(&self) -> &str {
        "Google Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
            | SourceCapabilities::YEAR_FILTER
            | SourceCapabilities::PAGINATION
            | SourceCapabilities::OPEN_ACCESS
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperSearchResult>, SourceError> {
        query.validate()?;

        if let Some(message) = limit_warning(query) {
            tracing::warn!("{}", message);
        }

        let url = self.build_url(query)?;

        let egress = self.egress.next_egress().await.map_err(|e| match e {
            SourceError::EgressUnavailable(_) => e,
            other => SourceError::EgressUnavailable(other.to_string()),
        })?;
        tracing::debug!("Fetching {} via egress {}", url, egress);

        let request = PageRequest::new(url)
            .egress(egress)
            .script(REVEAL_CITATION_SCRIPT);
        let page = self.fetcher.fetch(&request).await?;

        if page.status == 429 {
            return Err(SourceError::BlockedBySource(
                "Google Scholar returned HTTP 429".to_string(),
            ));
        }
        if page.body.trim().is_empty() {
            return Err(SourceError::EmptyResponse);
        }
        if !page.is_success() {
            if markup::is_blocking_page(&page.body) {
                return Err(SourceError::BlockedBySource(format!(
                    "Google Scholar served a block page with HTTP {}",
                    page.status
                )));
            }
            return Err(SourceError::Api(format!(
                "Google Scholar returned status: {}",
                page.status
            )));
        }

        let papers = markup::extract_results(&page.body)?;
        tracing::info!("Google Scholar returned {} results for '{}'", papers.len(), query.query);
        Ok(papers)
    }
}

/// Warning for a `limit` this engine cannot honor
fn limit_warning(query: &SearchQuery) -> Option<String> {
    query.limit.map(|limit| {
        format!(
            "Google Scholar does not support limit ({}); returning up to {} results",
            limit, RESULTS_PER_PAGE
        )
    })
}
