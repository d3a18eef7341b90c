//! Markdown report generation
//!
//! This module renders a scan report as markdown: run metadata, statistics,
//! and every finding grouped by page.

use crate::model::{FindingKind, Severity};
use crate::output::{OutputResult, ScanReport};
use crate::storage::FindingRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a scan report to a markdown file
pub fn write_markdown_report(report: &ScanReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Table cells may not contain pipes or line breaks
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Formats a scan report as markdown
pub fn format_markdown_report(report: &ScanReport) -> String {
    let scan = &report.scan;
    let stats = &report.statistics;
    let mut md = String::new();

    md.push_str(&format!("# Site Audit Report: {}\n\n", report.website.url));

    // Run metadata
    md.push_str("## Scan Information\n\n");
    md.push_str(&format!("- **Scan ID**: {}\n", scan.id));
    if let Some(name) = &report.website.name {
        md.push_str(&format!("- **Website**: {}\n", name));
    }
    md.push_str(&format!("- **Status**: {}\n", scan.status));
    md.push_str(&format!("- **Created**: {}\n", scan.created_at));
    if let Some(started) = &scan.started_at {
        md.push_str(&format!("- **Started**: {}\n", started));
    }
    if let Some(completed) = &scan.completed_at {
        md.push_str(&format!("- **Completed**: {}\n", completed));
    }
    if let Some(duration) = scan.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    if let Some(message) = &scan.error_message {
        md.push_str(&format!("- **Failure**: {}\n", message));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", scan.config_hash));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Processed**: {}\n", scan.pages_processed));
    md.push_str(&format!("- **Failed Fetches**: {}\n", stats.failed_pages));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n", stats.success_rate()));
    md.push_str(&format!("- **Total Findings**: {}\n\n", scan.errors_found));

    md.push_str("## Findings by Kind\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("|------|-------|\n");
    for kind in FindingKind::all() {
        md.push_str(&format!("| {} | {} |\n", kind, stats.count_kind(kind)));
    }
    md.push('\n');

    md.push_str("## Findings by Severity\n\n");
    md.push_str("| Severity | Count |\n");
    md.push_str("|----------|-------|\n");
    for severity in Severity::all().into_iter().rev() {
        md.push_str(&format!(
            "| {} | {} |\n",
            severity,
            stats.count_severity(severity)
        ));
    }
    md.push('\n');

    if !stats.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");

        let mut depths: Vec<_> = stats.depth_breakdown.iter().collect();
        depths.sort_by_key(|(d, _)| *d);

        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Per-page findings
    if !report.findings.is_empty() {
        md.push_str("## Findings\n\n");

        let mut current_page: Option<i64> = None;
        for finding in &report.findings {
            if current_page != Some(finding.page_id) {
                if current_page.is_some() {
                    md.push('\n');
                }
                current_page = Some(finding.page_id);
                md.push_str(&format!("### {}\n\n", finding.page_url));
                md.push_str("| Severity | Kind | Message | Context | Suggestion |\n");
                md.push_str("|----------|------|---------|---------|------------|\n");
            }
            md.push_str(&finding_row(finding));
        }
        md.push('\n');
    }

    let failed: Vec<_> = report
        .pages
        .iter()
        .filter(|p| !matches!(p.status_code, Some(code) if (200..300).contains(&code)))
        .collect();
    if !failed.is_empty() {
        md.push_str("## Pages That Failed to Load\n\n");
        for page in failed {
            let status = match (page.status_code, &page.error_message) {
                (Some(code), _) => format!("HTTP {}", code),
                (None, Some(message)) => message.clone(),
                (None, None) => "unknown".to_string(),
            };
            md.push_str(&format!("- {} ({})\n", page.url, cell(&status)));
        }
        md.push('\n');
    }

    md
}

fn finding_row(finding: &FindingRecord) -> String {
    let mut message = finding.message.clone();
    if let Some(link) = &finding.link_url {
        if !message.contains(link.as_str()) {
            message.push_str(&format!(" [{}]", link));
        }
    }

    format!(
        "| {} | {} | {} | {} | {} |\n",
        finding.severity,
        finding.kind,
        cell(&message),
        cell(finding.context.as_deref().unwrap_or("")),
        cell(finding.suggestion.as_deref().unwrap_or("")),
    )
}
