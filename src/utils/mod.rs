//! Utility modules supporting search, download and extraction.
//!
//! - [`HttpClient`]: shared HTTP client with timeouts and request rate limiting
//! - [`with_retry`] / [`RetryConfig`]: bounded retry with exponential backoff on
//!   transient failures
//! - [`merge_results`]: combine primary and secondary results without duplicates
//! - [`extract_text`]: bounded, page-by-page PDF text extraction
//! - validation helpers for tool arguments ([`validate_query`],
//!   [`validate_accession_number`], [`check_range`], ...)
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use adams_mcp::sources::SourceError;
//! use adams_mcp::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let data = with_retry(RetryConfig::default(), || fetch()).await?;
//! # Ok(())
//! # }
//! ```

mod dedup;
mod http;
mod pdf;
mod retry;
mod validate;

pub use dedup::{merge_results, normalize_title};
pub use http::{HttpClient, DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_TIMEOUT};
pub use pdf::{
    ensure_within, extract_text, extract_text_blocking, normalize_whitespace, PdfExtractError,
};
pub use retry::{with_retry, RetryConfig};
pub use validate::{
    check_range, parse_date, validate_accession_number, validate_query, validate_url,
    ValidationError, DAYS_BACK_RANGE, MAX_BATCH_SIZE, MAX_CHARS_RANGE, MAX_PAGES_RANGE,
    MAX_QUERY_LEN, MIN_QUERY_LEN, TOP_N_RANGE,
};
