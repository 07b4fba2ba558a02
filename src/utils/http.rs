//! HTTP client utilities.
//!
//! [`HttpClient`] wraps a shared `reqwest` client and a process-wide request
//! rate limiter. Every outbound request goes through [`HttpClient::send`], which
//! waits for a rate-limit slot and turns non-success statuses into
//! [`SourceError`]s.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder, Response};

use crate::sources::SourceError;

/// Default outbound request budget
pub const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(20u32);

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 300;

/// Shared HTTP client with timeouts and request rate limiting
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("client", &self.client)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl HttpClient {
    /// Create a client with the given per-request timeout and request budget.
    ///
    /// `requests_per_minute = None` disables rate limiting.
    pub fn new(
        timeout: Duration,
        requests_per_minute: Option<NonZeroU32>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Network(format!("failed to build HTTP client: {}", e)))?;

        let limiter = requests_per_minute.map(|rpm| {
            Arc::new(RateLimiter::direct(Quota::per_minute(rpm).allow_burst(rpm)))
        });

        Ok(Self {
            client: Arc::new(client),
            limiter,
        })
    }

    /// Client with default timeout and rate limit
    pub fn with_defaults() -> Result<Self, SourceError> {
        Self::new(DEFAULT_TIMEOUT, Some(DEFAULT_REQUESTS_PER_MINUTE))
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Wait until the rate limiter admits another request
    pub async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Send a request built from [`HttpClient::client`].
    ///
    /// Waits for the rate limiter first. Non-success statuses become errors via
    /// [`SourceError::from_status`], with a short excerpt of the response body.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, SourceError> {
        self.throttle().await;

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Network(format!("request timed out: {}", e))
            } else {
                SourceError::from(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        tracing::debug!(status = status.as_u16(), "request failed: {}", excerpt);
        Err(SourceError::from_status(status, excerpt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
            .mount(&server)
            .await;

        let http = HttpClient::new(Duration::from_secs(5), None).unwrap();
        let response = http
            .send(http.client().get(format!("{}/ok", server.uri())))
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_send_maps_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&server)
            .await;

        let http = HttpClient::with_defaults().unwrap();

        let err = http
            .send(http.client().get(format!("{}/missing", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));

        let err = http
            .send(http.client().get(format!("{}/busy", server.uri())))
            .await
            .unwrap_err();
        match err {
            SourceError::Server { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "try later");
            }
            other => panic!("Expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let http = HttpClient::new(Duration::from_secs(2), None).unwrap();
        // Port 9 (discard) is not expected to accept HTTP connections locally
        let err = http
            .send(http.client().get("http://127.0.0.1:9/"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
