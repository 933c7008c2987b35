//! Page fetching behind a trait, so engines never talk to the network directly.
//!
//! [`PageFetcher`] turns a [`PageRequest`] into raw markup and [`EgressPool`]
//! hands out the address each request leaves through. Both are injected into
//! engines as `Arc<dyn ...>`; tests substitute in-memory fakes.

mod egress;

pub use egress::{EgressAddress, EgressPool, ProxyPoolClient, StaticEgressPool};

use async_trait::async_trait;

use crate::config::HttpConfig;
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// One page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL of the page
    pub url: String,
    /// Address the request must leave through, or direct when `None`
    pub egress: Option<EgressAddress>,
    /// Scripts to run in the page before its markup is read
    pub scripts: Vec<String>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            egress: None,
            scripts: Vec::new(),
        }
    }

    pub fn egress(mut self, egress: EgressAddress) -> Self {
        self.egress = Some(egress);
        self
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(script.into());
        self
    }
}

/// Raw result of a page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// Page markup, possibly empty
    pub body: String,
}

impl FetchedPage {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves rendered page markup
#[async_trait]
pub trait PageFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch one page. Non-success statuses are returned, not raised; only
    /// transport failures are errors.
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, SourceError>;
}

/// [`PageFetcher`] over plain HTTP with reqwest.
///
/// Every request with an egress address gets its own proxied client; direct
/// requests share one client.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    user_agent: String,
    http: HttpConfig,
    direct: HttpClient,
}

impl HttpPageFetcher {
    pub fn new(user_agent: impl Into<String>, http: HttpConfig) -> Result<Self, SourceError> {
        let user_agent = user_agent.into();
        let direct = HttpClient::build(&user_agent, &http, None)?;
        Ok(Self {
            user_agent,
            http,
            direct,
        })
    }

    fn client_for(&self, egress: Option<&EgressAddress>) -> Result<HttpClient, SourceError> {
        match egress {
            Some(egress) => HttpClient::build(&self.user_agent, &self.http, Some(&egress.proxy_url())),
            None => Ok(self.direct.clone()),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, SourceError> {
        if !request.scripts.is_empty() {
            tracing::debug!(
                "Plain HTTP fetch cannot run {} page script(s); reading static markup",
                request.scripts.len()
            );
        }

        let client = self.client_for(request.egress.as_ref())?;
        let response = client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch {}: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read page body: {}", e)))?;

        tracing::debug!("Fetched {} ({} bytes, status {})", request.url, body.len(), status);
        Ok(FetchedPage { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_builder() {
        let egress: EgressAddress = "10.0.0.1:3128".parse().unwrap();
        let request = PageRequest::new("https://example.org/")
            .egress(egress.clone())
            .script("void 0;");

        assert_eq!(request.url, "https://example.org/");
        assert_eq!(request.egress, Some(egress));
        assert_eq!(request.scripts, vec!["void 0;"]);
    }

    #[test]
    fn test_fetched_page_success_range() {
        assert!(FetchedPage::new(200, "").is_success());
        assert!(!FetchedPage::new(429, "").is_success());
        assert!(!FetchedPage::new(302, "").is_success());
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let fetcher = HttpPageFetcher::new("test-agent", HttpConfig::default()).unwrap();
        let page = fetcher
            .fetch(&PageRequest::new(format!("{}/scholar", server.url())))
            .await
            .unwrap();

        assert_eq!(page, FetchedPage::new(429, "slow down"));
        mock.assert_async().await;
    }
}
