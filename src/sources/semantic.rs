//! Semantic Scholar Graph API engine.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, SemanticScholarConfig};
use crate::models::{Author, PaperSearchResult, SearchQuery};
use crate::sources::{SearchEngine, SourceCapabilities, SourceError};
use crate::utils::{strict_rate_limit_retry_config, with_retry, HttpClient, RetryConfig};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Largest page the search endpoint accepts
const MAX_LIMIT: usize = 100;

/// Fields requested for every paper
const PAPER_FIELDS: &str = "paperId,title,authors,externalIds,year,abstract,citationCount,venue,publicationVenue,isOpenAccess,openAccessPdf";

/// Semantic Scholar search engine
///
/// Requests are throttled client-side and rate-limited responses are retried
/// with backoff. An API key raises the upstream limits.
#[derive(Clone)]
pub struct SemanticScholarEngine {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry: RetryConfig,
}

impl std::fmt::Debug for SemanticScholarEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScholarEngine")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("retry", &self.retry)
            .finish()
    }
}

impl SemanticScholarEngine {
    /// Create an engine against the public API, one request per second
    pub fn new() -> Result<Self, SourceError> {
        Self::with_settings(&SemanticScholarConfig::default(), HttpClient::new()?)
    }

    /// Create an engine from the full configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::build(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            &config.http,
            None,
        )?;
        Self::with_settings(&config.semantic_scholar, client)
    }

    /// Create an engine from its own settings and a prepared client
    pub fn with_settings(
        settings: &SemanticScholarConfig,
        client: HttpClient,
    ) -> Result<Self, SourceError> {
        let rps = NonZeroU32::new(settings.requests_per_second).unwrap_or(nonzero!(1u32));
        let retry = strict_rate_limit_retry_config().max_attempts(settings.max_retries);

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|key| !key.trim().is_empty()),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            retry,
        })
    }

    /// Use an API key (optional, for higher rate limits)
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the retry policy for rate-limited requests
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// List the papers citing `paper_id`
    pub async fn paper_citations(
        &self,
        paper_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PaperSearchResult>, SourceError> {
        if paper_id.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "paper id must not be empty".to_string(),
            ));
        }

        let url = format!("{}/paper/{}/citations", self.base_url, paper_id.trim());
        let params = vec![
            ("fields", PAPER_FIELDS.to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ];

        let data: CitationsResponse = self.get_json(&url, &params).await?;
        let papers: Vec<PaperSearchResult> = data
            .data
            .into_iter()
            .filter_map(|citation| citation.citing_paper)
            .filter_map(parse_paper)
            .collect();

        tracing::debug!("Semantic Scholar returned {} citing papers for {}", papers.len(), paper_id);
        Ok(papers)
    }

    /// Throttled GET returning the decoded JSON body, retried while rate-limited
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        with_retry(self.retry, move || async move {
            self.limiter.until_ready().await;

            let mut request = self.client.get(url).query(params);
            if let Some(key) = &self.api_key {
                request = request.header("x-api-key", key);
            }

            let response = request.send().await.map_err(|e| {
                SourceError::Network(format!("Failed to reach Semantic Scholar: {}", e))
            })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(SourceError::RateLimit { retry_after });
            }

            let value: serde_json::Value = match response.json().await {
                Ok(value) => value,
                Err(_) if !status.is_success() => {
                    return Err(SourceError::Api(format!(
                        "Semantic Scholar API returned status: {}",
                        status
                    )))
                }
                Err(e) if e.is_decode() => {
                    return Err(SourceError::Parse(format!("Invalid JSON response: {}", e)))
                }
                Err(e) => {
                    return Err(SourceError::Network(format!("Failed to read response: {}", e)))
                }
            };

            if let Some(message) = error_message(&value) {
                return Err(SourceError::Api(message));
            }
            if !status.is_success() {
                return Err(SourceError::Api(format!(
                    "Semantic Scholar API returned status: {}",
                    status
                )));
            }

            Ok(serde_json::from_value(value)?)
        })
        .await
    }
}

#[async_trait]
impl SearchEngine for SemanticScholarEngine {
    fn id(&self) -> &str {
        "semantic"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
            | SourceCapabilities::YEAR_FILTER
            | SourceCapabilities::PAGINATION
            | SourceCapabilities::LIMIT
            | SourceCapabilities::OPEN_ACCESS
            | SourceCapabilities::CITATIONS
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperSearchResult>, SourceError> {
        query.validate()?;

        let mut params = vec![
            ("query", query.query.clone()),
            ("fields", PAPER_FIELDS.to_string()),
        ];
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(limit) = query.limit {
            if limit > MAX_LIMIT {
                tracing::warn!(
                    "Semantic Scholar returns at most {} results per request; clamping limit {}",
                    MAX_LIMIT,
                    limit
                );
            }
            params.push(("limit", limit.min(MAX_LIMIT).to_string()));
        }
        if let Some(year) = year_range(query.year_from, query.year_to) {
            params.push(("year", year));
        }

        let url = format!("{}/paper/search", self.base_url);
        let data: SearchResponse = self.get_json(&url, &params).await?;

        let papers: Vec<PaperSearchResult> = data.data.into_iter().filter_map(parse_paper).collect();
        tracing::info!("Semantic Scholar returned {} results for '{}'", papers.len(), query.query);
        Ok(papers)
    }
}

/// Encode year bounds as the API's `from-to` range
fn year_range(from: Option<i32>, to: Option<i32>) -> Option<String> {
    match (from, to) {
        (None, None) => None,
        (Some(from), Some(to)) => Some(format!("{}-{}", from, to)),
        (Some(from), None) => Some(format!("{}-", from)),
        (None, Some(to)) => Some(format!("-{}", to)),
    }
}

/// Error text of a body carrying `message`, `code` or `error`
fn error_message(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;
    if !["message", "code", "error"].iter().any(|key| object.contains_key(*key)) {
        return None;
    }

    let message = ["message", "error"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());
    Some(message)
}

/// Map one API paper; papers without a title are dropped
fn parse_paper(paper: S2Paper) -> Option<PaperSearchResult> {
    let title = paper.title.filter(|t| !t.trim().is_empty())?;

    let authors = paper.authors.into_iter().filter_map(parse_author).collect();

    let (venue_name, venue_url) = match paper.publication_venue {
        Some(venue) => (venue.name, venue.url),
        None => (None, None),
    };
    let venue_name = venue_name
        .filter(|name| !name.trim().is_empty())
        .or(paper.venue);

    let mut builder = PaperSearchResult::builder(&title)
        .authors(authors)
        .year(paper.year)
        .abstract_text(paper.r#abstract)
        .citation_count(paper.citation_count.and_then(|c| u32::try_from(c).ok()))
        .venue_name(venue_name)
        .venue_url(venue_url);

    builder = match paper.is_open_access {
        Some(true) => builder.open_access(paper.open_access_pdf.and_then(|pdf| pdf.url)),
        Some(false) => builder.closed_access(),
        None => builder,
    };

    builder.build().ok()
}

fn parse_author(author: S2Author) -> Option<Author> {
    let mut parsed = Author::new(author.name.as_deref()?).ok()?;

    if let Some(id) = external_id(&author.external_ids, "googleScholarId") {
        parsed = parsed.google_scholar_id(id);
    }
    if let Some(id) = external_id(&author.external_ids, "DBLP") {
        parsed = parsed.dblp_id(id);
    }
    if let Some(id) = external_id(&author.external_ids, "ORCID") {
        parsed = parsed.orcid_id(id);
    }

    let affiliations: Vec<&str> = author
        .affiliations
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if !affiliations.is_empty() {
        parsed = parsed.affiliation(affiliations.join("; "));
    }

    if let Some(homepage) = author.homepage.filter(|h| !h.trim().is_empty()) {
        parsed = parsed.homepage(homepage);
    }

    Some(parsed)
}

/// An external id may be a string, a number or a list of either; lists
/// contribute their first entry
fn external_id(ids: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    let value = match ids.get(key)? {
        serde_json::Value::Array(values) => values.first()?,
        value => value,
    };

    let id = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
struct CitationsResponse {
    #[serde(default)]
    data: Vec<S2Citation>,
}

#[derive(Debug, Deserialize)]
struct S2Citation {
    #[serde(rename = "citingPaper")]
    citing_paper: Option<S2Paper>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    authors: Vec<S2Author>,
    year: Option<i32>,
    r#abstract: Option<String>,
    #[serde(rename = "citationCount")]
    citation_count: Option<i64>,
    venue: Option<String>,
    #[serde(rename = "publicationVenue")]
    publication_venue: Option<S2Venue>,
    #[serde(rename = "isOpenAccess")]
    is_open_access: Option<bool>,
    #[serde(rename = "openAccessPdf")]
    open_access_pdf: Option<S2OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
    #[serde(rename = "externalIds", default, deserialize_with = "null_as_default")]
    external_ids: HashMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    affiliations: Vec<String>,
    homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Venue {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2OpenAccessPdf {
    url: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn engine(server: &Server) -> SemanticScholarEngine {
        let settings = SemanticScholarConfig {
            base_url: server.url(),
            api_key: None,
            requests_per_second: 100,
            max_retries: 3,
        };
        SemanticScholarEngine::with_settings(&settings, HttpClient::new().unwrap())
            .unwrap()
            .with_retry_config(RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                backoff_multiplier: 2.0,
            })
    }

    fn sample_body() -> String {
        json!({
            "total": 2,
            "offset": 0,
            "data": [
                {
                    "paperId": "abc",
                    "title": "Attention  Is All You Need",
                    "authors": [
                        {
                            "authorId": "1",
                            "name": "Ashish Vaswani",
                            "externalIds": {"DBLP": ["Ashish Vaswani"], "ORCID": "0000-0001"},
                            "affiliations": ["Google Brain", "USC"],
                            "homepage": "https://example.org/~av"
                        },
                        {"authorId": "2", "name": "Noam Shazeer"},
                        {"authorId": null, "name": null}
                    ],
                    "year": 2017,
                    "abstract": "The dominant sequence transduction models...",
                    "citationCount": 100000,
                    "venue": "NeurIPS",
                    "publicationVenue": {"name": "Neural Information Processing Systems", "url": "https://neurips.cc"},
                    "isOpenAccess": true,
                    "openAccessPdf": {"url": "https://arxiv.org/pdf/1706.03762"}
                },
                {
                    "paperId": "def",
                    "title": "Closed paper",
                    "authors": [],
                    "year": null,
                    "abstract": null,
                    "citationCount": 0,
                    "venue": "Some Journal",
                    "publicationVenue": null,
                    "isOpenAccess": false,
                    "openAccessPdf": {"url": "https://example.org/should-not-appear.pdf"}
                },
                {"paperId": "ghi", "title": null}
            ]
        })
        .to_string()
    }

    #[test]
    fn test_year_range() {
        assert_eq!(year_range(Some(2018), Some(2020)).as_deref(), Some("2018-2020"));
        assert_eq!(year_range(Some(2018), None).as_deref(), Some("2018-"));
        assert_eq!(year_range(None, Some(2020)).as_deref(), Some("-2020"));
        assert_eq!(year_range(None, None), None);
    }

    #[tokio::test]
    async fn test_search_maps_records() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "attention".into()),
                Matcher::UrlEncoded("year".into(), "2016-".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
                Matcher::UrlEncoded("fields".into(), PAPER_FIELDS.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(sample_body())
            .create_async()
            .await;

        let papers = engine(&server)
            .search(&SearchQuery::new("attention").year_from(2016).limit(5))
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title, "Attention Is All You Need");
        assert_eq!(first.author_names(), vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(first.authors[0].dblp_id.as_deref(), Some("Ashish Vaswani"));
        assert_eq!(first.authors[0].orcid_id.as_deref(), Some("0000-0001"));
        assert_eq!(first.authors[0].affiliation.as_deref(), Some("Google Brain; USC"));
        assert_eq!(first.authors[0].homepage.as_deref(), Some("https://example.org/~av"));
        assert_eq!(first.authors[1].affiliation, None);
        assert_eq!(first.year, Some(2017));
        assert_eq!(first.citation_count, Some(100000));
        assert_eq!(
            first.venue_name.as_deref(),
            Some("Neural Information Processing Systems")
        );
        assert_eq!(first.venue_url.as_deref(), Some("https://neurips.cc"));
        assert_eq!(first.is_open_access, Some(true));
        assert_eq!(
            first.open_access_link.as_deref(),
            Some("https://arxiv.org/pdf/1706.03762")
        );

        let second = &papers[1];
        assert!(second.authors.is_empty());
        assert_eq!(second.year, None);
        assert_eq!(second.citation_count, Some(0));
        assert_eq!(second.venue_name.as_deref(), Some("Some Journal"));
        assert_eq!(second.is_open_access, Some(false));
        assert_eq!(second.open_access_link, None);
    }

    #[tokio::test]
    async fn test_missing_data_is_empty() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total": 0, "offset": 0}"#)
            .create_async()
            .await;

        let papers = engine(&server).search(&SearchQuery::new("nothing")).await.unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::UrlEncoded("limit".into(), "100".into()))
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        engine(&server)
            .search(&SearchQuery::new("widgets").limit(500))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": "Unrecognized or unsupported fields: [foo]"}"#)
            .create_async()
            .await;

        match engine(&server).search(&SearchQuery::new("widgets")).await {
            Err(SourceError::Api(message)) => assert!(message.contains("unsupported fields")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_bodies() {
        let mut server = Server::new_async().await;
        let _gateway = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::UrlEncoded("query".into(), "gateway".into()))
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;
        let _garbled = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::UrlEncoded("query".into(), "garbled".into()))
            .with_status(200)
            .with_body("{\"data\": [")
            .create_async()
            .await;

        let engine = engine(&server);
        assert!(matches!(
            engine.search(&SearchQuery::new("gateway")).await,
            Err(SourceError::Api(_))
        ));
        assert!(matches!(
            engine.search(&SearchQuery::new("garbled")).await,
            Err(SourceError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("Retry-After", "0")
            .with_body(r#"{"message": "Too Many Requests", "code": "429"}"#)
            .expect(3)
            .create_async()
            .await;

        let result = engine(&server).search(&SearchQuery::new("widgets")).await;
        assert!(matches!(result, Err(SourceError::RateLimit { .. })));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        engine(&server)
            .with_api_key("secret")
            .search(&SearchQuery::new("widgets"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_paper_citations() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/abc/citations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("offset".into(), "10".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "offset": 10,
                    "data": [
                        {"citingPaper": {"paperId": "x", "title": "Follow-up work", "year": 2020}},
                        {"citingPaper": {"paperId": "y", "title": null}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let papers = engine(&server).paper_citations("abc", 10, 2).await.unwrap();
        mock.assert_async().await;

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Follow-up work");
        assert_eq!(papers[0].year, Some(2020));
        assert_eq!(papers[0].is_open_access, None);
    }

    #[test]
    fn test_external_id_shapes() {
        let ids: HashMap<String, serde_json::Value> = serde_json::from_value(json!({
            "DBLP": ["First", "Second"],
            "ORCID": "0000-0002",
            "CorpusId": 42,
            "Empty": []
        }))
        .unwrap();

        assert_eq!(external_id(&ids, "DBLP").as_deref(), Some("First"));
        assert_eq!(external_id(&ids, "ORCID").as_deref(), Some("0000-0002"));
        assert_eq!(external_id(&ids, "CorpusId").as_deref(), Some("42"));
        assert_eq!(external_id(&ids, "Empty"), None);
        assert_eq!(external_id(&ids, "Missing"), None);
    }
}
