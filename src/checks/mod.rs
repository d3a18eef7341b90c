//! Page checkers and the orchestrator that runs them
//!
//! Every checker implements [`PageCheck`]. The orchestrator keeps a registry of
//! checkers built for one scan and runs the applicable ones over each page.
//!
//! # Components
//!
//! - `address`: Ukrainian postal address format
//! - `phone`: Ukrainian phone number format and clickability
//! - `links`: broken link probing with per-scan memoization
//! - `seo`: head metadata, favicon and robots.txt
//! - `grammar`: spelling/grammar through an external oracle

mod address;
mod grammar;
mod links;
mod orchestrator;
mod phone;
mod seo;

pub use address::{AddressCheck, AddressMatcher};
pub use grammar::{GrammarAdapter, GrammarCheck, GrammarOracle, LanguageToolOracle, OracleMatch};
pub use links::{LinkChecker, LinkProbe};
pub use orchestrator::Orchestrator;
pub use phone::{PhoneCheck, PhoneValidation, PhoneValidator};
pub use seo::SeoInspector;

use crate::model::{FetchedPage, Finding, FindingKind, Preferences};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while building or running a checker
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Grammar oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Failed(String),
}

/// Errors raised by the grammar oracle
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle answered HTTP {0}")]
    Status(u16),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for checker operations
pub type CheckResult<T> = std::result::Result<T, CheckError>;

/// One checker over fetched pages
#[async_trait]
pub trait PageCheck: Send + Sync {
    /// Stable name used in logs and in failure findings
    fn name(&self) -> &'static str;

    /// Kind of every finding this checker produces
    fn kind(&self) -> FindingKind;

    /// Whether the checker should run for this page under these preferences
    fn applicable(&self, page: &FetchedPage, prefs: &Preferences) -> bool;

    async fn run(&self, page: &FetchedPage) -> CheckResult<Vec<Finding>>;
}

/// Returns the text around a byte range, widened by `radius` characters on each side
///
/// `start` and `end` must lie on character boundaries (regex match bounds do).
pub fn context_window(text: &str, start: usize, end: usize, radius: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    text[from..to].trim().to_string()
}
