//! Core data model shared by the crawler, the checkers and storage
//!
//! - `ScanTarget` / `Preferences`: what a scan audits and which checks are on
//! - `FetchedPage` / `PageStatus`: what the fetcher produced for one URL
//! - `Finding`: one issue on one page

mod finding;
mod page;
mod target;

pub use finding::{Finding, FindingKind, Severity};
pub use page::{FetchedPage, PageStatus};
pub use target::{Preferences, ScanTarget};
