//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "scholar-harvest.toml";

/// Prefix for environment overrides, e.g. `SCHOLAR_HARVEST__HTTP__TIMEOUT_SECS`
const ENV_PREFIX: &str = "SCHOLAR_HARVEST";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Google Scholar results-page engine
    #[serde(default)]
    pub google_scholar: GoogleScholarConfig,

    /// Semantic Scholar API engine
    #[serde(default)]
    pub semantic_scholar: SemanticScholarConfig,

    /// Shared HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings for the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Google Scholar engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleScholarConfig {
    /// Scheme and host of the results pages
    #[serde(default = "default_scholar_base_url")]
    pub base_url: String,

    /// Interface language (`hl` parameter)
    #[serde(default = "default_language")]
    pub language: String,

    /// User agent sent with page requests
    #[serde(default = "default_browser_user_agent")]
    pub user_agent: String,

    /// Endpoint returning one `host:port` egress address per GET
    #[serde(default)]
    pub proxy_pool_url: Option<String>,

    /// Fixed egress addresses, rotated round-robin when no pool endpoint is set.
    /// With a single entry every request leaves through the same address.
    #[serde(default)]
    pub proxies: Vec<String>,
}

impl Default for GoogleScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_scholar_base_url(),
            language: default_language(),
            user_agent: default_browser_user_agent(),
            proxy_pool_url: None,
            proxies: Vec::new(),
        }
    }
}

fn default_scholar_base_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}

/// Semantic Scholar engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticScholarConfig {
    /// Graph API base URL
    #[serde(default = "default_semantic_base_url")]
    pub base_url: String,

    /// API key (optional, for higher rate limits)
    #[serde(default = "default_semantic_api_key")]
    pub api_key: Option<String>,

    /// Client-side request budget
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Attempts for a rate-limited request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_semantic_base_url(),
            api_key: default_semantic_api_key(),
            requests_per_second: default_rps(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_semantic_base_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

fn default_semantic_api_key() -> Option<String> {
    std::env::var("SEMANTIC_SCHOLAR_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}

fn default_rps() -> u32 {
    1
}

fn default_max_retries() -> u32 {
    3
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when neither `RUST_LOG` nor a verbosity flag is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from a file, with `SCHOLAR_HARVEST__*` environment
/// variables layered on top
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find the first existing config file: `./scholar-harvest.toml`, then
/// `<config dir>/scholar-harvest/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("scholar-harvest").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}
