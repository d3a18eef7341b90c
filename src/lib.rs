//! Site-Audit: a crawl-and-check auditor for Ukrainian-language websites
//!
//! This crate crawls a single site within page and depth bounds, runs a set of
//! pluggable checkers over every fetched page (spelling, postal addresses, broken
//! links, phone numbers, SEO), and persists the resulting tree of pages and
//! findings together with scan progress and failure state.

pub mod checks;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod robots;
pub mod scan;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Check setup error: {0}")]
    Check(#[from] checks::CheckError),

    #[error("Invalid scan status transition: {from} -> {to}")]
    InvalidTransition {
        from: state::ScanStatus,
        to: state::ScanStatus,
    },

    #[error("Scan {0} not found")]
    ScanNotFound(i64),

    #[error("Scan target for scan {0} is missing")]
    TargetMissing(i64),

    #[error("Scan {0} was cancelled")]
    Cancelled(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Site-Audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Settings;
pub use model::{FetchedPage, Finding, FindingKind, PageStatus, Preferences, ScanTarget, Severity};
pub use scan::ScanController;
pub use state::{ProgressSnapshot, ScanStatus};
pub use url::normalize_url;
