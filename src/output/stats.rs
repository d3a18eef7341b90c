//! Statistics generation from the scan database
//!
//! This module provides functionality for extracting and displaying
//! scan statistics from the storage layer.

use crate::model::{FindingKind, Severity};
use crate::output::OutputResult;
use crate::storage::ScanStore;
use std::collections::HashMap;

/// Scan statistics summary
#[derive(Debug, Clone, Default)]
pub struct ScanStatistics {
    /// Pages stored for the scan
    pub total_pages: u64,

    /// Stored pages whose fetch did not return 2xx
    pub failed_pages: u64,

    pub total_findings: u64,

    pub findings_by_kind: HashMap<FindingKind, u64>,

    pub findings_by_severity: HashMap<Severity, u64>,

    /// Page count per crawl depth
    pub depth_breakdown: HashMap<u32, u64>,
}

impl ScanStatistics {
    /// Share of stored pages fetched successfully, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (self.total_pages - self.failed_pages) as f64 / self.total_pages as f64 * 100.0
    }

    pub fn count_kind(&self, kind: FindingKind) -> u64 {
        self.findings_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn count_severity(&self, severity: Severity) -> u64 {
        self.findings_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Loads statistics for one scan
pub fn load_statistics(store: &dyn ScanStore, scan_id: i64) -> OutputResult<ScanStatistics> {
    let pages = store.list_pages(scan_id)?;
    let failed_pages = pages
        .iter()
        .filter(|p| !matches!(p.status_code, Some(code) if (200..300).contains(&code)))
        .count() as u64;

    Ok(ScanStatistics {
        total_pages: pages.len() as u64,
        failed_pages,
        total_findings: store.count_findings(scan_id)?,
        findings_by_kind: store.findings_by_kind(scan_id)?,
        findings_by_severity: store.findings_by_severity(scan_id)?,
        depth_breakdown: store.depth_breakdown(scan_id)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ScanStatistics) {
    println!("=== Scan Statistics ===\n");

    println!("Pages:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Failed fetches: {}", stats.failed_pages);
    println!("  Success rate: {:.1}%", stats.success_rate());
    println!();

    println!("Findings by kind ({} total):", stats.total_findings);
    for kind in FindingKind::all() {
        println!("  {}: {}", kind, stats.count_kind(kind));
    }
    println!();

    println!("Findings by severity:");
    for severity in Severity::all().into_iter().rev() {
        println!("  {}: {}", severity, stats.count_severity(severity));
    }

    if !stats.depth_breakdown.is_empty() {
        println!();
        println!("Pages by depth:");
        let mut depths: Vec<_> = stats.depth_breakdown.iter().collect();
        depths.sort();
        for (depth, count) in depths {
            println!("  {}: {}", depth, count);
        }
    }
}
