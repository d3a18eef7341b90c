//! Site-Audit main entry point
//!
//! This is the command-line interface for the Site-Audit crawl-and-check auditor.

use anyhow::Context;
use clap::{Parser, Subcommand};
use site_audit::checks::GrammarAdapter;
use site_audit::config::{load_config_with_hash, Settings};
use site_audit::crawler::build_http_client;
use site_audit::output::{build_report, print_statistics, write_markdown_report};
use site_audit::scan::schedule_scan;
use site_audit::storage::{open_storage, ScanStore};
use site_audit::{Preferences, ScanController};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Audit: a crawl-and-check auditor for Ukrainian-language websites
///
/// Site-Audit crawls one site within page and depth bounds, checks every page
/// for spelling, address, link, phone and SEO problems, and stores the findings
/// for reporting.
#[derive(Parser, Debug)]
#[command(name = "site-audit")]
#[command(version = "1.0.0")]
#[command(about = "A crawl-and-check auditor for Ukrainian websites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a website (if new) and run a scan of it
    Scan(ScanArgs),

    /// Show the progress of a scan
    Status {
        #[arg(value_name = "SCAN_ID")]
        scan_id: i64,
    },

    /// Show statistics for a scan and optionally write a markdown report
    Report {
        #[arg(value_name = "SCAN_ID")]
        scan_id: i64,

        /// Write the markdown report to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete a scan with its pages and findings
    Delete {
        #[arg(value_name = "SCAN_ID")]
        scan_id: i64,
    },

    /// Mark scans left running by a crashed process as failed
    Recover,
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Root URL of the site to audit
    #[arg(long)]
    url: String,

    /// Display name for a newly registered website
    #[arg(long)]
    name: Option<String>,

    /// Maximum number of pages to fetch
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum link depth from the root page
    #[arg(long)]
    max_depth: Option<u32>,

    #[arg(long)]
    no_spelling: bool,

    #[arg(long)]
    no_addresses: bool,

    #[arg(long)]
    no_links: bool,

    #[arg(long)]
    no_phones: bool,

    #[arg(long)]
    no_seo: bool,

    /// Path prefix to skip while crawling, e.g. /admin (repeatable)
    #[arg(long = "exclude", value_name = "PATH")]
    exclude_paths: Vec<String>,

    /// Word the spelling check should accept (repeatable)
    #[arg(long = "whitelist", value_name = "WORD")]
    whitelist_words: Vec<String>,
}

impl ScanArgs {
    fn preferences(&self) -> Preferences {
        let defaults = Preferences::default();
        Preferences {
            spelling: !self.no_spelling,
            addresses: !self.no_addresses,
            links: !self.no_links,
            phones: !self.no_phones,
            seo: !self.no_seo,
            max_pages: self.max_pages.unwrap_or(defaults.max_pages),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            exclude_paths: self.exclude_paths.clone(),
            whitelist_words: self.whitelist_words.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (settings, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let database = PathBuf::from(&settings.storage.database_path);

    match cli.command {
        Command::Scan(args) => handle_scan(settings, &config_hash, &args).await,
        Command::Status { scan_id } => handle_status(&database, scan_id),
        Command::Report { scan_id, output } => handle_report(&database, scan_id, output.as_deref()),
        Command::Delete { scan_id } => handle_delete(&database, scan_id),
        Command::Recover => handle_recover(&database),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_audit=info,warn"),
            1 => EnvFilter::new("site_audit=debug,info"),
            2 => EnvFilter::new("site_audit=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the scan command: registers the website, then runs the scan to a terminal state
async fn handle_scan(settings: Settings, config_hash: &str, args: &ScanArgs) -> anyhow::Result<()> {
    let database = Path::new(&settings.storage.database_path);
    let mut store = open_storage(database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;

    let scan_id = schedule_scan(
        &mut store,
        &args.url,
        args.name.as_deref(),
        args.preferences(),
        config_hash,
    )?;
    println!("Scan {} scheduled for {}", scan_id, args.url);

    let client = build_http_client(&settings).context("Failed to build HTTP client")?;
    let grammar = Arc::new(GrammarAdapter::from_config(client.clone(), &settings.grammar).await);

    let mut controller = ScanController::new(store, settings, client, grammar);

    // Ctrl-C cancels the scan; it is then stored as failed
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling scan");
            interrupt.cancel();
        }
    });

    let mut progress = controller.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            if let Some(snapshot) = snapshot {
                tracing::debug!(
                    "Scan {}: {}/{} pages ({:.1}%), {} findings",
                    snapshot.scan_id,
                    snapshot.pages_processed,
                    snapshot.pages_found,
                    snapshot.progress_percent(),
                    snapshot.errors_found
                );
            }
        }
    });

    let outcome = controller.run(scan_id, cancel).await;
    drop(controller);
    let _ = reporter.await;

    let scan = outcome.with_context(|| format!("Scan {} failed", scan_id))?;
    println!(
        "✓ Scan {} {}: {} pages, {} findings",
        scan.id, scan.status, scan.pages_processed, scan.errors_found
    );

    Ok(())
}

/// Handles the status command: prints the scan's progress snapshot
fn handle_status(database: &Path, scan_id: i64) -> anyhow::Result<()> {
    let store = open_storage(database)?;
    let scan = store.get_scan(scan_id)?;
    let snapshot = scan.progress();

    println!("Scan {}", scan.id);
    println!("  Status: {}", snapshot.status);
    println!("  Pages found: {}", snapshot.pages_found);
    println!("  Pages processed: {}", snapshot.pages_processed);
    println!("  Findings: {}", snapshot.errors_found);
    println!("  Progress: {:.1}%", snapshot.progress_percent());
    if let Some(message) = &scan.error_message {
        println!("  Error: {}", message);
    }

    Ok(())
}

/// Handles the report command: prints statistics and optionally writes markdown
fn handle_report(database: &Path, scan_id: i64, output: Option<&Path>) -> anyhow::Result<()> {
    let store = open_storage(database)?;

    tracing::info!("Loading scan {} from database...", scan_id);
    let report = build_report(&store, scan_id)?;

    println!("Website: {}", report.website.url);
    println!("Scan {} ({})\n", report.scan.id, report.scan.status);
    print_statistics(&report.statistics);

    if let Some(path) = output {
        tracing::info!("Generating markdown report...");
        write_markdown_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("\n✓ Report exported to: {}", path.display());
    }

    Ok(())
}

/// Handles the delete command
fn handle_delete(database: &Path, scan_id: i64) -> anyhow::Result<()> {
    let mut store = open_storage(database)?;
    store.delete_scan(scan_id)?;
    println!("✓ Scan {} deleted", scan_id);
    Ok(())
}

/// Handles the recover command
fn handle_recover(database: &Path) -> anyhow::Result<()> {
    let mut store = open_storage(database)?;
    let recovered = store.recover_orphaned()?;
    println!("✓ Marked {} orphaned scan(s) as failed", recovered);
    Ok(())
}
