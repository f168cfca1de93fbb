//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Per-source pagination limits
    #[serde(default)]
    pub limits: Limits,

    /// Background detail backfill settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if url::Url::parse(&self.crawler.base_url).is_err() {
            return Err(AppError::validation(format!(
                "crawler.base_url is not a valid URL: {}",
                self.crawler.base_url
            )));
        }
        if self.enrichment.concurrency == 0 {
            return Err(AppError::validation("enrichment.concurrency must be > 0"));
        }
        if self.enrichment.save_interval_ms == 0 {
            return Err(AppError::validation(
                "enrichment.save_interval_ms must be > 0",
            ));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Platform origin, e.g. `https://www.youtube.com`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept-Language header; relative-time texts are parsed in English
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Web client version announced on continuation requests
    #[serde(default = "defaults::client_version")]
    pub client_version: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between continuation requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum channels crawled concurrently in a batch
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            client_version: defaults::client_version(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Stop and skip limits applied while paging through a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Limits {
    /// Maximum accepted items across Videos and Streams (`None` = unlimited)
    #[serde(default)]
    pub count_limit: Option<usize>,

    /// Stop once an item is older than this many days
    #[serde(default)]
    pub max_age_days: Option<u32>,

    /// Skip Videos/Streams shorter than this
    #[serde(default)]
    pub min_length_secs: Option<u32>,

    /// Maximum Shorts to collect; 0 disables the Shorts run
    #[serde(default)]
    pub shorts_limit: usize,
}

/// Enrichment worker pool and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Number of concurrent detail fetchers
    #[serde(default = "defaults::enrich_concurrency")]
    pub concurrency: usize,

    /// Pause after each detail fetch, per worker
    #[serde(default = "defaults::enrich_delay")]
    pub request_delay_ms: u64,

    /// Minimum spacing between progress saves while a job runs
    #[serde(default = "defaults::save_interval")]
    pub save_interval_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::enrich_concurrency(),
            request_delay_ms: defaults::enrich_delay(),
            save_interval_ms: defaults::save_interval(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn base_url() -> String {
        "https://www.youtube.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9".into()
    }
    pub fn client_version() -> String {
        "2.20240101.00.00".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        250
    }
    pub fn max_concurrent() -> usize {
        3
    }

    // Enrichment defaults
    pub fn enrich_concurrency() -> usize {
        3
    }
    pub fn enrich_delay() -> u64 {
        1000
    }
    pub fn save_interval() -> u64 {
        5000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.enrichment.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [limits]
            max_age_days = 30
            shorts_limit = 10

            [enrichment]
            concurrency = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.max_age_days, Some(30));
        assert_eq!(config.limits.shorts_limit, 10);
        assert_eq!(config.limits.count_limit, None);
        assert_eq!(config.enrichment.concurrency, 5);
        assert_eq!(config.enrichment.request_delay_ms, 1000);
        assert_eq!(config.crawler.base_url, "https://www.youtube.com");
    }

    #[test]
    fn load_or_default_handles_missing_file() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.enrichment.concurrency, 3);
    }
}
