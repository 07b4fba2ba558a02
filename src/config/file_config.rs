//! Configuration file discovery and layered loading.
//!
//! # Configuration File Format
//!
//! ```toml
//! [adams]
//! api_key = "your-subscription-key"
//! page_size = 100
//!
//! [google]
//! api_key = "your-google-key"
//! engine_id = "your-cx"
//! max_results = 10
//!
//! [downloads]
//! directory = "./downloads"
//! max_file_size_mb = 50
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 1000
//!
//! [rate_limits]
//! requests_per_minute = 20
//!
//! [pdf]
//! default_max_chars = 2000
//! restrict_to_downloads = true
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```
//!
//! Any key can be overridden from the environment as `ADAMS_MCP__SECTION__KEY`,
//! e.g. `ADAMS_MCP__RATE_LIMITS__REQUESTS_PER_MINUTE=10`. The conventional
//! `ADAMS_API_KEY`, `GOOGLE_API_KEY` and `GOOGLE_CX` variables fill in credentials
//! that are not set otherwise.

use std::path::{Path, PathBuf};

use super::Config;

/// Prefix for environment overrides
const ENV_PREFIX: &str = "ADAMS_MCP";

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "adams-mcp.toml";

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// Locate a configuration file.
///
/// Checks `./adams-mcp.toml`, then `<config dir>/adams-mcp/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("adams-mcp").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from defaults, an optional file and the environment.
///
/// An explicitly given `path` must exist; otherwise [`find_config_file`] is used
/// and a missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigLoadError> {
    let file = match path {
        Some(path) if !path.is_file() => return Err(ConfigLoadError::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut builder = config::Config::builder();
    if let Some(file) = &file {
        tracing::debug!("Loading configuration from {}", file.display());
        builder = builder.add_source(config::File::from(file.as_path()).format(config::FileFormat::Toml));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    apply_env_fallbacks(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Fill unset credentials from the conventional environment variables
fn apply_env_fallbacks(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if config.adams.api_key.is_none() {
        config.adams.api_key = lookup("ADAMS_API_KEY");
    }
    if config.google.api_key.is_none() {
        config.google.api_key = lookup("GOOGLE_API_KEY");
    }
    if config.google.engine_id.is_none() {
        config.google.engine_id = lookup("GOOGLE_CX");
    }
}
