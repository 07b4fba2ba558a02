//! Document search adapters.
//!
//! This module defines the [`Source`] trait implemented by each search backend:
//!
//! - [`AdamsSource`]: the ADAMS Public Search API (primary, authoritative metadata,
//!   document lookup and PDF download)
//! - [`GoogleSource`]: Google Custom Search scoped to the NRC web domain (secondary,
//!   optional)
//! - [`MockSource`]: canned results for tests
//!
//! [`HybridSearch`] runs a primary and a secondary source for one request and
//! merges their results.

mod adams;
mod google;
mod hybrid;
pub mod mock;

pub use adams::{extract_year_range, AdamsSource};
pub use google::{GoogleCredentials, GoogleSource};
pub use hybrid::HybridSearch;
pub use mock::MockSource;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::models::{DegradationReason, SearchRequest, SourceResults};
use crate::utils::ValidationError;

/// A searchable document backend.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "adams", "google")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for documents matching an already validated request
    async fn search(&self, request: &SearchRequest) -> Result<SourceResults, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection failure, reset or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 5xx
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 429
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// HTTP 4xx other than 404 and 429
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// HTTP 404 or a missing record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parsing error (JSON, XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response was received but is not usable (wrong content type, too large)
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Input validation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The source has no credentials configured
    #[error("Source not configured: {0}")]
    NotConfigured(String),

    /// Filesystem error while writing a download
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Map an HTTP error status and response body to an error
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            404 => SourceError::NotFound(message),
            429 => SourceError::RateLimit(message),
            code if status.is_server_error() => SourceError::Server {
                status: code,
                message,
            },
            code => SourceError::Rejected {
                status: code,
                message,
            },
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SourceError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Network(_) | SourceError::Server { .. } | SourceError::RateLimit(_)
        )
    }

    /// How a secondary-source failure is reported to callers
    pub fn degradation_reason(&self) -> DegradationReason {
        match self {
            SourceError::NotConfigured(_) => DegradationReason::Unconfigured,
            SourceError::RateLimit(_) => DegradationReason::QuotaExceeded,
            SourceError::Rejected {
                status: 403,
                message,
            } if mentions_quota(message) => DegradationReason::QuotaExceeded,
            _ => DegradationReason::NetworkError,
        }
    }
}

fn mentions_quota(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["quota", "ratelimit", "rate limit", "dailylimit", "daily limit"]
        .iter()
        .any(|needle| lower.contains(needle))
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::from_status(status, err.to_string()),
            None => SourceError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
