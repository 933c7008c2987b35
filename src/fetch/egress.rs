//! Egress address rotation.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::sources::SourceError;
use crate::utils::HttpClient;

/// A `host:port` an outbound request can be routed through
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EgressAddress {
    host: String,
    port: u16,
}

impl EgressAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Proxy URL for this address (`http://host:port`)
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl FromStr for EgressAddress {
    type Err = SourceError;

    /// Accepts `host:port`, optionally prefixed with `http://`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let address = trimmed.strip_prefix("http://").unwrap_or(trimmed);
        let address = address.trim_end_matches('/');

        let invalid = || SourceError::EgressUnavailable(format!("invalid egress address '{}'", trimmed));

        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for EgressAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Source of egress addresses; each call may return a different one
#[async_trait]
pub trait EgressPool: Send + Sync + std::fmt::Debug {
    /// Next address to use. Failure means no address is available right now.
    async fn next_egress(&self) -> Result<EgressAddress, SourceError>;
}

/// Asks a proxy-pool service for a random address per call.
///
/// The endpoint answers a GET with a bare `host:port` body.
#[derive(Debug, Clone)]
pub struct ProxyPoolClient {
    client: HttpClient,
    endpoint: String,
}

impl ProxyPoolClient {
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EgressPool for ProxyPoolClient {
    async fn next_egress(&self) -> Result<EgressAddress, SourceError> {
        let response = self.client.get(&self.endpoint).send().await.map_err(|e| {
            SourceError::EgressUnavailable(format!("proxy pool unreachable: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(SourceError::EgressUnavailable(format!(
                "proxy pool returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            SourceError::EgressUnavailable(format!("failed to read proxy pool response: {}", e))
        })?;

        let egress: EgressAddress = body.parse()?;
        tracing::debug!("Proxy pool assigned egress {}", egress);
        Ok(egress)
    }
}

/// Round-robin over a fixed address list. An empty list always fails, and a
/// single address is reused by every call.
#[derive(Debug, Default)]
pub struct StaticEgressPool {
    addresses: Vec<EgressAddress>,
    cursor: AtomicUsize,
}

impl StaticEgressPool {
    pub fn new(addresses: Vec<EgressAddress>) -> Self {
        if addresses.len() == 1 {
            tracing::warn!(
                "Only one egress address ({}) configured; every request will reuse it",
                addresses[0]
            );
        }
        Self {
            addresses,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Parse `host:port` strings; the first invalid entry is an error
    pub fn parse<S: AsRef<str>>(addresses: &[S]) -> Result<Self, SourceError> {
        let addresses = addresses
            .iter()
            .map(|a| a.as_ref().parse())
            .collect::<Result<Vec<EgressAddress>, _>>()?;
        Ok(Self::new(addresses))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// True when consecutive calls cannot get distinct addresses
    pub fn reuses_addresses(&self) -> bool {
        self.addresses.len() == 1
    }
}

#[async_trait]
impl EgressPool for StaticEgressPool {
    async fn next_egress(&self) -> Result<EgressAddress, SourceError> {
        if self.addresses.is_empty() {
            return Err(SourceError::EgressUnavailable(
                "no egress addresses configured".to_string(),
            ));
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.addresses.len();
        Ok(self.addresses[index].clone())
    }
}
