//! Output module for scan reports
//!
//! This module handles:
//! - Collecting a scan, its website, pages and findings into one report
//! - Rendering the report as markdown
//! - Printing scan statistics

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, ScanStatistics};

use crate::storage::{FindingRecord, PageRecord, ScanRecord, ScanStore, StorageError, WebsiteRecord};
use thiserror::Error;

/// Errors raised while building or writing a report
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a report shows about one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub website: WebsiteRecord,
    pub scan: ScanRecord,
    pub statistics: ScanStatistics,
    pub pages: Vec<PageRecord>,
    /// Findings ordered by page, then insertion
    pub findings: Vec<FindingRecord>,
}

/// Builds a report for a scan in any state
pub fn build_report(store: &dyn ScanStore, scan_id: i64) -> OutputResult<ScanReport> {
    let scan = store.get_scan(scan_id)?;
    let website = store.get_website(scan.website_id)?;

    Ok(ScanReport {
        statistics: load_statistics(store, scan_id)?,
        pages: store.list_pages(scan_id)?,
        findings: store.list_findings(scan_id)?,
        website,
        scan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn test_report_for_missing_scan() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(matches!(
            build_report(&store, 5),
            Err(OutputError::Storage(StorageError::ScanNotFound(5)))
        ));
    }
}
