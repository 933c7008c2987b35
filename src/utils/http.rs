//! HTTP client utilities.

use reqwest::{Client, Proxy, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        Self::build(user_agent, &HttpConfig::default(), None)
    }

    /// Create a client with explicit timeouts, routing every request through
    /// `proxy` when one is given (`http://host:port`)
    pub fn build(
        user_agent: &str,
        http: &HttpConfig,
        proxy: Option<&str>,
    ) -> Result<Self, SourceError> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(http.timeout_secs))
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(proxy) = proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| SourceError::EgressUnavailable(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}
