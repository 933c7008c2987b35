//! Utility modules shared by the engines.
//!
//! - [`HttpClient`]: reqwest client with timeouts, user agent and optional proxy
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use scholar_harvest::sources::SourceError;
//! use scholar_harvest::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let data = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;

pub use http::HttpClient;
pub use retry::{strict_rate_limit_retry_config, with_retry, RetryConfig, TransientError};
