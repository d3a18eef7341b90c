//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ScanStore trait.

use crate::model::{FetchedPage, Finding, FindingKind, Preferences, Severity};
use crate::state::ScanStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ScanStore, StorageError, StorageResult};
use crate::storage::{
    FindingRecord, PageContent, PageRecord, ScanCounters, ScanRecord, WebsiteRecord,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Message stored on scans failed by orphan recovery
pub const ORPHANED_MESSAGE: &str = "Scan interrupted: worker stopped before completion";

const SCAN_COLUMNS: &str = "id, website_id, status, pages_found, pages_processed, errors_found,
     error_message, config_hash, created_at, started_at, completed_at";

const WEBSITE_COLUMNS: &str = "id, url, domain, name, preferences, created_at";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn scan_status(&self, scan_id: i64) -> StorageResult<ScanStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM scans WHERE id = ?1",
                params![scan_id],
                |row| row.get(0),
            )
            .optional()?;

        let status = status.ok_or(StorageError::ScanNotFound(scan_id))?;
        ScanStatus::from_db_string(&status)
            .ok_or_else(|| StorageError::InvalidRecord(format!("scan status '{}'", status)))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn scan_from_row(row: &Row) -> rusqlite::Result<ScanRecord> {
    Ok(ScanRecord {
        id: row.get(0)?,
        website_id: row.get(1)?,
        status: ScanStatus::from_db_string(&row.get::<_, String>(2)?).unwrap_or(ScanStatus::Failed),
        pages_found: row.get::<_, i64>(3)? as u64,
        pages_processed: row.get::<_, i64>(4)? as u64,
        errors_found: row.get::<_, i64>(5)? as u64,
        error_message: row.get(6)?,
        config_hash: row.get(7)?,
        created_at: row.get(8)?,
        started_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

/// Website row with its preferences still serialized
fn website_from_row(row: &Row) -> rusqlite::Result<(WebsiteRecord, String)> {
    Ok((
        WebsiteRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            domain: row.get(2)?,
            name: row.get(3)?,
            preferences: Preferences::default(),
            created_at: row.get(5)?,
        },
        row.get(4)?,
    ))
}

fn with_preferences((mut website, json): (WebsiteRecord, String)) -> StorageResult<WebsiteRecord> {
    website.preferences = serde_json::from_str(&json)?;
    Ok(website)
}

fn page_from_row(row: &Row) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        scan_id: row.get(1)?,
        url: row.get(2)?,
        status_code: row.get(3)?,
        error_message: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        keywords: row.get(7)?,
        has_favicon: row.get(8)?,
        depth: row.get(9)?,
        checked_at: row.get(10)?,
    })
}

fn finding_from_row(row: &Row) -> rusqlite::Result<FindingRecord> {
    Ok(FindingRecord {
        id: row.get(0)?,
        page_id: row.get(1)?,
        page_url: row.get(2)?,
        kind: FindingKind::from_db_string(&row.get::<_, String>(3)?).unwrap_or(FindingKind::Seo),
        severity: Severity::from_db_string(&row.get::<_, String>(4)?).unwrap_or(Severity::Info),
        message: row.get(5)?,
        context: row.get(6)?,
        suggestion: row.get(7)?,
        link_url: row.get(8)?,
        link_status: row.get(9)?,
        rule_id: row.get(10)?,
        category: row.get(11)?,
        text_offset: row.get::<_, Option<i64>>(12)?.map(|o| o as u64),
    })
}

impl ScanStore for SqliteStore {
    // ===== Websites =====

    fn create_website(
        &mut self,
        url: &str,
        domain: &str,
        name: Option<&str>,
        preferences: &Preferences,
    ) -> StorageResult<i64> {
        let preferences = serde_json::to_string(preferences)?;
        self.conn.execute(
            "INSERT INTO websites (url, domain, name, preferences, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![url, domain, name, preferences, now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_website(&self, website_id: i64) -> StorageResult<WebsiteRecord> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM websites WHERE id = ?1", WEBSITE_COLUMNS),
                params![website_id],
                website_from_row,
            )
            .optional()?
            .ok_or(StorageError::WebsiteNotFound(website_id))?;

        with_preferences(row)
    }

    fn find_website_by_url(&self, url: &str) -> StorageResult<Option<WebsiteRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM websites WHERE url = ?1", WEBSITE_COLUMNS),
                params![url],
                website_from_row,
            )
            .optional()?
            .map(with_preferences)
            .transpose()
    }

    fn update_preferences(
        &mut self,
        website_id: i64,
        preferences: &Preferences,
    ) -> StorageResult<()> {
        let preferences = serde_json::to_string(preferences)?;
        let changed = self.conn.execute(
            "UPDATE websites SET preferences = ?1 WHERE id = ?2",
            params![preferences, website_id],
        )?;
        if changed == 0 {
            return Err(StorageError::WebsiteNotFound(website_id));
        }
        Ok(())
    }

    // ===== Scans =====

    fn create_scan(&mut self, website_id: i64, config_hash: &str) -> StorageResult<i64> {
        // surface a missing website as such rather than as a foreign key failure
        self.get_website(website_id)?;

        self.conn.execute(
            "INSERT INTO scans (website_id, status, config_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                website_id,
                ScanStatus::Pending.to_db_string(),
                config_hash,
                now()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_scan(&self, scan_id: i64) -> StorageResult<ScanRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM scans WHERE id = ?1", SCAN_COLUMNS),
                params![scan_id],
                scan_from_row,
            )
            .optional()?
            .ok_or(StorageError::ScanNotFound(scan_id))
    }

    fn list_scans(&self, website_id: i64) -> StorageResult<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scans WHERE website_id = ?1 ORDER BY id DESC",
            SCAN_COLUMNS
        ))?;

        let scans = stmt
            .query_map(params![website_id], scan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(scans)
    }

    fn update_scan_status(
        &mut self,
        scan_id: i64,
        from: ScanStatus,
        to: ScanStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = now();
        let started_at = (to == ScanStatus::Running).then(|| now.clone());
        let completed_at = to.is_terminal().then(|| now.clone());

        let changed = self.conn.execute(
            "UPDATE scans SET
                status = ?1,
                started_at = COALESCE(?2, started_at),
                completed_at = COALESCE(?3, completed_at),
                error_message = COALESCE(?4, error_message),
                pages_found = CASE WHEN ?5 THEN pages_processed ELSE pages_found END
             WHERE id = ?6 AND status = ?7",
            params![
                to.to_db_string(),
                started_at,
                completed_at,
                error_message,
                to.is_terminal(),
                scan_id,
                from.to_db_string()
            ],
        )?;

        if changed == 0 {
            let actual = self.scan_status(scan_id)?;
            return Err(StorageError::StatusConflict {
                scan_id,
                expected: from,
                actual,
            });
        }

        Ok(())
    }

    fn record_page(
        &mut self,
        scan_id: i64,
        page: &FetchedPage,
        findings: &[Finding],
        pages_found: u64,
    ) -> StorageResult<ScanCounters> {
        self.scan_status(scan_id)?;

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO pages (scan_id, url, status_code, error_message, title, description,
             keywords, has_favicon, depth, checked_at, html_content, text_content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                scan_id,
                page.url.as_str(),
                page.status.code(),
                page.status.error_message(),
                page.title,
                page.description,
                page.keywords,
                page.has_favicon,
                page.depth,
                now(),
                page.html,
                page.text
            ],
        )?;
        let page_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO findings (page_id, kind, severity, message, context, suggestion,
                 link_url, link_status, rule_id, category, text_offset)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for finding in findings {
                stmt.execute(params![
                    page_id,
                    finding.kind.to_db_string(),
                    finding.severity.to_db_string(),
                    finding.message,
                    finding.context,
                    finding.suggestion,
                    finding.link_url,
                    finding.link_status,
                    finding.rule_id,
                    finding.category,
                    finding.offset.map(|o| o as i64),
                ])?;
            }
        }

        tx.execute(
            "UPDATE scans SET
                pages_processed = pages_processed + 1,
                errors_found = errors_found + ?1,
                pages_found = MAX(pages_found, ?2, pages_processed + 1)
             WHERE id = ?3",
            params![findings.len() as i64, pages_found as i64, scan_id],
        )?;

        let counters = tx.query_row(
            "SELECT pages_found, pages_processed, errors_found FROM scans WHERE id = ?1",
            params![scan_id],
            |row| {
                Ok(ScanCounters {
                    pages_found: row.get::<_, i64>(0)? as u64,
                    pages_processed: row.get::<_, i64>(1)? as u64,
                    errors_found: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;

        tx.commit()?;
        Ok(counters)
    }

    fn delete_scan(&mut self, scan_id: i64) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM scans WHERE id = ?1", params![scan_id])?;
        if changed == 0 {
            return Err(StorageError::ScanNotFound(scan_id));
        }
        info!("Deleted scan {}", scan_id);
        Ok(())
    }

    // ===== Pages and findings =====

    fn list_pages(&self, scan_id: i64) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, scan_id, url, status_code, error_message, title, description, keywords,
             has_favicon, depth, checked_at
             FROM pages WHERE scan_id = ?1 ORDER BY id",
        )?;

        let pages = stmt
            .query_map(params![scan_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn page_content(&self, page_id: i64) -> StorageResult<Option<PageContent>> {
        let content = self
            .conn
            .query_row(
                "SELECT html_content, text_content FROM pages WHERE id = ?1",
                params![page_id],
                |row| {
                    Ok(PageContent {
                        html: row.get(0)?,
                        text: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(content)
    }

    fn list_findings(&self, scan_id: i64) -> StorageResult<Vec<FindingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.page_id, p.url, f.kind, f.severity, f.message, f.context, f.suggestion,
             f.link_url, f.link_status, f.rule_id, f.category, f.text_offset
             FROM findings f JOIN pages p ON f.page_id = p.id
             WHERE p.scan_id = ?1
             ORDER BY p.id, f.id",
        )?;

        let findings = stmt
            .query_map(params![scan_id], finding_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(findings)
    }

    fn count_findings(&self, scan_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM findings f JOIN pages p ON f.page_id = p.id WHERE p.scan_id = ?1",
            params![scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Statistics =====

    fn findings_by_kind(&self, scan_id: i64) -> StorageResult<HashMap<FindingKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.kind, COUNT(*) FROM findings f JOIN pages p ON f.page_id = p.id
             WHERE p.scan_id = ?1 GROUP BY f.kind",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![scan_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = FindingKind::from_db_string(&kind) {
                counts.insert(kind, count as u64);
            }
        }

        Ok(counts)
    }

    fn findings_by_severity(&self, scan_id: i64) -> StorageResult<HashMap<Severity, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.severity, COUNT(*) FROM findings f JOIN pages p ON f.page_id = p.id
             WHERE p.scan_id = ?1 GROUP BY f.severity",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![scan_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (severity, count) = row?;
            if let Some(severity) = Severity::from_db_string(&severity) {
                counts.insert(severity, count as u64);
            }
        }

        Ok(counts)
    }

    fn depth_breakdown(&self, scan_id: i64) -> StorageResult<HashMap<u32, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT depth, COUNT(*) FROM pages WHERE scan_id = ?1 GROUP BY depth ORDER BY depth",
        )?;

        let rows = stmt.query_map(params![scan_id], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut breakdown = HashMap::new();
        for row in rows {
            let (depth, count) = row?;
            breakdown.insert(depth, count);
        }

        Ok(breakdown)
    }

    // ===== Recovery =====

    fn orphaned_scans(&self) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM scans WHERE status = ?1 ORDER BY id")?;

        let ids = stmt
            .query_map(params![ScanStatus::Running.to_db_string()], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    fn recover_orphaned(&mut self) -> StorageResult<usize> {
        let mut recovered = 0;
        for scan_id in self.orphaned_scans()? {
            match self.update_scan_status(
                scan_id,
                ScanStatus::Running,
                ScanStatus::Failed,
                Some(ORPHANED_MESSAGE),
            ) {
                Ok(()) => {
                    warn!("Marked orphaned scan {} as failed", scan_id);
                    recovered += 1;
                }
                // finished between the listing and the update
                Err(StorageError::StatusConflict { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(recovered)
    }
}
