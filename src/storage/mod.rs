//! Storage module for persisting scan data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Website registration with per-site preferences
//! - Scan lifecycle rows and their counters
//! - Transactional page + findings inserts
//! - Orphaned scan recovery

mod schema;
mod sqlite;
mod traits;

pub use schema::{schema_version, SCHEMA_VERSION};
pub use sqlite::SqliteStore;
pub use traits::{ScanStore, StorageError, StorageResult};

use crate::model::{FindingKind, Preferences, Severity};
use crate::state::{ProgressSnapshot, ScanStatus};
use std::path::Path;

/// Opens or creates a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// A registered website
#[derive(Debug, Clone)]
pub struct WebsiteRecord {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub name: Option<String>,
    pub preferences: Preferences,
    pub created_at: String,
}

/// One scan run
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub id: i64,
    pub website_id: i64,
    pub status: ScanStatus,
    pub pages_found: u64,
    pub pages_processed: u64,
    pub errors_found: u64,
    pub error_message: Option<String>,
    pub config_hash: String,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl ScanRecord {
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            scan_id: self.id,
            status: self.status,
            pages_found: self.pages_found,
            pages_processed: self.pages_processed,
            errors_found: self.errors_found,
        }
    }

    /// Seconds between start and completion, when both are recorded
    pub fn duration_seconds(&self) -> Option<i64> {
        let started = self.started_at.as_deref()?;
        let completed = self.completed_at.as_deref()?;
        let started = chrono::DateTime::parse_from_rfc3339(started).ok()?;
        let completed = chrono::DateTime::parse_from_rfc3339(completed).ok()?;
        Some((completed - started).num_seconds())
    }
}

/// Scan counters after a page was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCounters {
    pub pages_found: u64,
    pub pages_processed: u64,
    pub errors_found: u64,
}

/// A stored page
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub scan_id: i64,
    pub url: String,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub has_favicon: bool,
    pub depth: u32,
    pub checked_at: String,
}

/// Raw markup and extracted visible text of a stored page
///
/// Kept out of [`PageRecord`] so listing pages stays cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub html: String,
    pub text: String,
}

/// A stored finding with the URL of its page
#[derive(Debug, Clone)]
pub struct FindingRecord {
    pub id: i64,
    pub page_id: i64,
    pub page_url: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    pub context: Option<String>,
    pub suggestion: Option<String>,
    pub link_url: Option<String>,
    pub link_status: Option<u16>,
    pub rule_id: Option<String>,
    pub category: Option<String>,
    pub text_offset: Option<u64>,
}
