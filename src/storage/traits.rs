//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{FetchedPage, Finding, FindingKind, Preferences, Severity};
use crate::state::ScanStatus;
use crate::storage::{
    FindingRecord, PageContent, PageRecord, ScanCounters, ScanRecord, WebsiteRecord,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Website not found: {0}")]
    WebsiteNotFound(i64),

    #[error("Scan not found: {0}")]
    ScanNotFound(i64),

    #[error("Scan {scan_id} is {actual}, expected {expected}")]
    StatusConflict {
        scan_id: i64,
        expected: ScanStatus,
        actual: ScanStatus,
    },

    #[error("Corrupt record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The scan controller is the only writer during a scan, so implementations
/// take `&mut self` for writes and need no internal locking.
pub trait ScanStore {
    // ===== Websites =====

    /// Registers a website and returns its ID
    fn create_website(
        &mut self,
        url: &str,
        domain: &str,
        name: Option<&str>,
        preferences: &Preferences,
    ) -> StorageResult<i64>;

    fn get_website(&self, website_id: i64) -> StorageResult<WebsiteRecord>;

    fn find_website_by_url(&self, url: &str) -> StorageResult<Option<WebsiteRecord>>;

    fn update_preferences(&mut self, website_id: i64, preferences: &Preferences)
        -> StorageResult<()>;

    // ===== Scans =====

    /// Creates a pending scan for a website
    fn create_scan(&mut self, website_id: i64, config_hash: &str) -> StorageResult<i64>;

    fn get_scan(&self, scan_id: i64) -> StorageResult<ScanRecord>;

    /// Lists a website's scans, newest first
    fn list_scans(&self, website_id: i64) -> StorageResult<Vec<ScanRecord>>;

    /// Moves a scan from `from` to `to`
    ///
    /// The update only applies while the stored status still equals `from`.
    /// Entering running stamps `started_at`; entering a terminal state stamps
    /// `completed_at` and sets `pages_found` to `pages_processed`.
    ///
    /// # Returns
    ///
    /// * `Err(StorageError::StatusConflict)` - The stored status differs from `from`
    /// * `Err(StorageError::ScanNotFound)` - No such scan
    fn update_scan_status(
        &mut self,
        scan_id: i64,
        from: ScanStatus,
        to: ScanStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Persists one checked page with its findings and advances the counters
    ///
    /// Runs in a single transaction: the page row, every finding row and the
    /// counter update commit together or not at all.
    ///
    /// # Arguments
    ///
    /// * `scan_id` - The owning scan
    /// * `page` - The fetched page
    /// * `findings` - Findings produced for the page
    /// * `pages_found` - URLs the crawl has scheduled so far (never lowered)
    fn record_page(
        &mut self,
        scan_id: i64,
        page: &FetchedPage,
        findings: &[Finding],
        pages_found: u64,
    ) -> StorageResult<ScanCounters>;

    /// Deletes a scan with its pages and findings
    fn delete_scan(&mut self, scan_id: i64) -> StorageResult<()>;

    // ===== Pages and findings =====

    fn list_pages(&self, scan_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Loads the stored markup and visible text of one page
    fn page_content(&self, page_id: i64) -> StorageResult<Option<PageContent>>;

    /// Lists a scan's findings ordered by page, then insertion
    fn list_findings(&self, scan_id: i64) -> StorageResult<Vec<FindingRecord>>;

    /// Counts the scan's live finding rows
    fn count_findings(&self, scan_id: i64) -> StorageResult<u64>;

    // ===== Statistics =====

    fn findings_by_kind(&self, scan_id: i64) -> StorageResult<HashMap<FindingKind, u64>>;

    fn findings_by_severity(&self, scan_id: i64) -> StorageResult<HashMap<Severity, u64>>;

    /// Page count per crawl depth
    fn depth_breakdown(&self, scan_id: i64) -> StorageResult<HashMap<u32, u64>>;

    // ===== Recovery =====

    /// IDs of scans left running by a worker that is gone
    fn orphaned_scans(&self) -> StorageResult<Vec<i64>>;

    /// Marks every orphaned scan failed and returns how many were changed
    fn recover_orphaned(&mut self) -> StorageResult<usize>;
}
