//! Google Custom Search source, restricted to the NRC web domain.
//!
//! Used as an optional secondary source. Without credentials every search fails
//! with [`SourceError::NotConfigured`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::models::{
    AccessionNumber, DocumentBuilder, DocumentSource, SearchRequest, SourceResults,
};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
const DEFAULT_DOMAIN: &str = "nrc.gov";
/// The Custom Search API returns at most 10 results per request
const MAX_RESULTS_PER_REQUEST: u32 = 10;

/// API key and search engine id for Google Custom Search
#[derive(Clone, PartialEq, Eq)]
pub struct GoogleCredentials {
    api_key: String,
    engine_id: String,
}

impl GoogleCredentials {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }
}

impl fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// Google Custom Search client
#[derive(Debug, Clone)]
pub struct GoogleSource {
    http: Arc<HttpClient>,
    credentials: Option<GoogleCredentials>,
    base_url: String,
    domain: String,
    max_results: u32,
}

impl GoogleSource {
    pub fn new(http: Arc<HttpClient>, credentials: Option<GoogleCredentials>) -> Self {
        Self {
            http,
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            max_results: MAX_RESULTS_PER_REQUEST,
        }
    }

    pub fn from_config(http: Arc<HttpClient>, config: &Config) -> Self {
        Self::new(http, config.google.credentials())
            .with_base_url(&config.google.base_url)
            .with_domain(&config.google.domain)
            .with_max_results(config.google.max_results)
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.trim().to_string();
        self
    }

    /// Results requested per search, clamped to 1..=10
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_PER_REQUEST);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn site_query(&self, query: &str) -> String {
        if self.domain.is_empty() {
            query.to_string()
        } else {
            format!("site:{} {}", self.domain, query)
        }
    }
}

/// Whether a result link can refer to a document at all
fn is_document_link(link: &str) -> bool {
    let lower = link.trim().to_lowercase();
    !lower.is_empty() && !lower.starts_with("mailto:") && !lower.contains('@')
}

#[async_trait]
impl Source for GoogleSource {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }


    async fn search(&self, request: &SearchRequest) -> Result<SourceResults, SourceError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            SourceError::NotConfigured("GOOGLE_API_KEY and GOOGLE_CX are not set".to_string())
        })?;

        let num = self.max_results.to_string();
        let q = self.site_query(&request.query);
        let http_request = self.http.client().get(&self.base_url).query(&[
            ("key", credentials.api_key.as_str()),
            ("cx", credentials.engine_id.as_str()),
            ("q", q.as_str()),
            ("num", num.as_str()),
        ]);

        let response = self.http.send(http_request).await?;
        let body = response.text().await?;
        let parsed: CseResponse = serde_json::from_str(&body)?;

        let documents: Vec<_> = parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let link = item.link.filter(|l| is_document_link(l))?;
                let title = item
                    .title
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| link.clone());

                let mut builder = DocumentBuilder::new(title, DocumentSource::Secondary)
                    .snippet(item.snippet);
                if let Some(acc) = AccessionNumber::find_in(&link) {
                    builder = builder.accession_number(acc);
                }
                Some(builder.download_url(Some(link)).build())
            })
            .collect();

        tracing::debug!("Google returned {} usable results", documents.len());
        Ok(SourceResults::new(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> Arc<HttpClient> {
        Arc::new(HttpClient::with_defaults().unwrap())
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = GoogleCredentials::new("secret-key", "engine");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("engine"));
    }

    #[test]
    fn test_is_document_link() {
        assert!(is_document_link("https://www.nrc.gov/docs/ML2400/ML24001A001.pdf"));
        assert!(!is_document_link("mailto:opa@nrc.gov"));
        assert!(!is_document_link("https://user@nrc.gov/page"));
        assert!(!is_document_link(""));
    }

    #[test]
    fn test_max_results_clamped() {
        let source = GoogleSource::new(http(), None).with_max_results(50);
        assert_eq!(source.max_results, 10);
        let source = GoogleSource::new(http(), None).with_max_results(0);
        assert_eq!(source.max_results, 1);
    }

    #[test]
    fn test_site_query() {
        let source = GoogleSource::new(http(), None);
        assert_eq!(source.site_query("reactor"), "site:nrc.gov reactor");
    }
}
