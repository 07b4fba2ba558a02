//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `ADAMS_MCP__SECTION__KEY` environment variables. See [`load_config`].

mod file_config;

pub use file_config::{find_config_file, load_config, ConfigLoadError};

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sources::GoogleCredentials;
use crate::utils::RetryConfig;

/// Placeholder shown instead of secrets
const REDACTED: &str = "<redacted>";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ADAMS Public Search API
    pub adams: AdamsConfig,

    /// Google Custom Search (secondary source)
    pub google: GoogleConfig,

    /// Download settings
    pub downloads: DownloadConfig,

    /// Retry policy for outbound requests
    pub retry: RetrySettings,

    /// Rate limiting settings
    pub rate_limits: RateLimitConfig,

    /// PDF extraction settings
    pub pdf: PdfConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Copy of this configuration with secrets replaced by a placeholder
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let hide = |value: &mut Option<String>| {
            if value.is_some() {
                *value = Some(REDACTED.to_string());
            }
        };
        hide(&mut config.adams.api_key);
        hide(&mut config.google.api_key);
        hide(&mut config.google.engine_id);
        config
    }
}

/// ADAMS API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamsConfig {
    /// Subscription key sent as `Ocp-Apim-Subscription-Key`
    pub api_key: Option<String>,

    /// Search endpoint; single documents are fetched from `{base_url}/{accession}`
    pub base_url: String,

    /// Canonical PDF location (`{docs_base_url}/{folder}/{accession}.pdf`)
    pub docs_base_url: String,

    /// Mirror tried when the canonical location fails
    pub mirror_base_url: String,

    /// Results per search page
    pub page_size: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AdamsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://adams-api.nrc.gov/aps/api/search".to_string(),
            docs_base_url: "https://www.nrc.gov/docs".to_string(),
            mirror_base_url: "https://pbadupws.nrc.gov/docs".to_string(),
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

/// Google Custom Search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// API key
    pub api_key: Option<String>,

    /// Programmable search engine id (`cx`)
    pub engine_id: Option<String>,

    /// Custom Search endpoint
    pub base_url: String,

    /// Domain results are restricted to
    pub domain: String,

    /// Results requested per search (the API allows at most 10)
    pub max_results: u32,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            domain: "nrc.gov".to_string(),
            max_results: 10,
        }
    }
}

impl GoogleConfig {
    /// Credentials, if both the key and the engine id are set and non-empty
    pub fn credentials(&self) -> Option<GoogleCredentials> {
        let api_key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let engine_id = self
            .engine_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())?;
        Some(GoogleCredentials::new(api_key, engine_id))
    }
}

/// Download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Default download directory
    pub directory: PathBuf,

    /// Maximum file size for downloads (in MB)
    pub max_file_size_mb: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./downloads"),
            max_file_size_mb: 50,
        }
    }
}

impl DownloadConfig {
    pub fn max_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub attempt_timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            attempt_timeout_secs: 60,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
            attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs.max(1)),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Outbound requests per minute across all sources; 0 disables limiting
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 20,
        }
    }
}

impl RateLimitConfig {
    pub fn quota(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.requests_per_minute)
    }
}

/// PDF extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Default `max_chars` for `summarize_pdf`
    pub default_max_chars: usize,

    /// Only read PDFs located inside the downloads directory
    pub restrict_to_downloads: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            default_max_chars: 2000,
            restrict_to_downloads: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,

    /// Output format
    pub format: LogFormat,

    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.adams.page_size, 100);
        assert_eq!(config.google.max_results, 10);
        assert_eq!(config.google.domain, "nrc.gov");
        assert_eq!(config.downloads.max_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.rate_limits.quota(), NonZeroU32::new(20));
        assert_eq!(config.pdf.default_max_chars, 2000);
        assert!(config.pdf.restrict_to_downloads);
    }

    #[test]
    fn test_google_credentials_require_both_parts() {
        let mut google = GoogleConfig::default();
        assert!(google.credentials().is_none());

        google.api_key = Some("key".to_string());
        assert!(google.credentials().is_none());

        google.engine_id = Some("  ".to_string());
        assert!(google.credentials().is_none());

        google.engine_id = Some("cx".to_string());
        assert!(google.credentials().is_some());
    }

    #[test]
    fn test_retry_settings_conversion() {
        let settings = RetrySettings {
            max_attempts: 0,
            initial_delay_ms: 250,
            ..RetrySettings::default()
        };
        let retry = RetryConfig::from(&settings);
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_rate_limit_zero_disables() {
        let limits = RateLimitConfig {
            requests_per_minute: 0,
        };
        assert!(limits.quota().is_none());
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = Config::default();
        config.adams.api_key = Some("secret".to_string());
        config.google.api_key = Some("gkey".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.adams.api_key.as_deref(), Some(REDACTED));
        assert_eq!(redacted.google.api_key.as_deref(), Some(REDACTED));
        assert_eq!(redacted.google.engine_id, None);
    }
}
