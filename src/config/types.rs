use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Site-Audit
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub grammar: GrammarConfig,
}

/// Crawler and checker behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Timeout applied to every network call (page fetch, link probe, robots/favicon probe)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Number of page fetches allowed in flight at once
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Number of outbound links expanded per fetched page
    #[serde(rename = "link-fanout")]
    pub link_fanout: usize,

    /// Number of pages whose checks may run at the same time
    #[serde(rename = "check-concurrency")]
    pub check_concurrency: usize,

    /// Number of link probes in flight per page
    #[serde(rename = "link-probe-concurrency")]
    pub link_probe_concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_workers: 5,
            link_fanout: 20,
            check_concurrency: 4,
            link_probe_concurrency: 8,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Grammar oracle (LanguageTool server) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub enabled: bool,

    /// Base URL of the LanguageTool HTTP server
    pub endpoint: String,

    /// Language code passed with every check request
    pub language: String,

    /// Maximum number of characters sent in one oracle call
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:8081".to_string(),
            language: "uk-UA".to_string(),
            chunk_size: 20_000,
        }
    }
}
