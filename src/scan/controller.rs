//! Scan lifecycle controller
//!
//! Turns a pending scan row into a persisted tree of pages and findings:
//! - Loads the target and builds the per-scan checker registry
//! - Moves the scan pending -> running, stamping the start time
//! - Streams pages from the frontier and checks them with bounded concurrency
//! - Persists each page with its findings in one transaction
//! - Publishes a progress snapshot after every page
//! - Moves the scan to completed, or to failed with the error message

use crate::checks::{GrammarAdapter, Orchestrator};
use crate::config::Settings;
use crate::crawler::{Frontier, HttpFetcher, PageFetcher};
use crate::model::ScanTarget;
use crate::state::{ProgressSnapshot, ScanStatus};
use crate::storage::{ScanRecord, ScanStore, StorageError};
use crate::{AuditError, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs scans against a store
///
/// The controller is the single writer of its store while a scan runs.
pub struct ScanController<S: ScanStore> {
    store: S,
    settings: Settings,
    client: Client,
    fetcher: Arc<dyn PageFetcher>,
    grammar: Arc<GrammarAdapter>,
    progress: watch::Sender<Option<ProgressSnapshot>>,
}

impl<S: ScanStore> ScanController<S> {
    /// Creates a controller that fetches pages over HTTP with `client`
    pub fn new(store: S, settings: Settings, client: Client, grammar: Arc<GrammarAdapter>) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(client.clone()));
        let (progress, _) = watch::channel(None);
        Self {
            store,
            settings,
            client,
            fetcher,
            grammar,
            progress,
        }
    }

    /// Replaces the page fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Receives a snapshot after every status change and every processed page
    pub fn subscribe(&self) -> watch::Receiver<Option<ProgressSnapshot>> {
        self.progress.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs a pending scan to a terminal state
    ///
    /// # Returns
    ///
    /// * `Ok(ScanRecord)` - The completed scan
    /// * `Err(AuditError)` - The scan could not start, or failed; a scan that
    ///   started is left `failed` with the error message
    pub async fn run(&mut self, scan_id: i64, cancel: CancellationToken) -> Result<ScanRecord> {
        let scan = self.store.get_scan(scan_id).map_err(|e| match e {
            StorageError::ScanNotFound(id) => AuditError::ScanNotFound(id),
            other => other.into(),
        })?;
        scan.status.transition(ScanStatus::Running)?;

        let (target, orchestrator) = match self.prepare(&scan) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Scan {} setup failed: {}", scan_id, e);
                self.finish(scan_id, ScanStatus::Pending, ScanStatus::Failed, Some(&e))?;
                return Err(e);
            }
        };

        self.store
            .update_scan_status(scan_id, ScanStatus::Pending, ScanStatus::Running, None)?;
        self.publish(scan_id)?;
        info!("Scan {} running for {}", scan_id, target.root_url);

        match self.execute(scan_id, &target, &orchestrator, cancel).await {
            Ok(()) => {
                self.finish(scan_id, ScanStatus::Running, ScanStatus::Completed, None)?;
                let scan = self.store.get_scan(scan_id)?;
                info!(
                    "Scan {} completed: {} pages, {} findings",
                    scan_id, scan.pages_processed, scan.errors_found
                );
                Ok(scan)
            }
            Err(e) => {
                error!("Scan {} failed: {}", scan_id, e);
                self.finish(scan_id, ScanStatus::Running, ScanStatus::Failed, Some(&e))?;
                Err(e)
            }
        }
    }

    /// Loads the target and builds the checker registry
    fn prepare(&self, scan: &ScanRecord) -> Result<(ScanTarget, Orchestrator)> {
        let website = self.store.get_website(scan.website_id).map_err(|e| match e {
            StorageError::WebsiteNotFound(_) => AuditError::TargetMissing(scan.id),
            other => other.into(),
        })?;

        let target = ScanTarget::parse(&website.url, website.preferences)?;
        let orchestrator = Orchestrator::for_target(
            &target,
            self.client.clone(),
            Arc::clone(&self.grammar),
            &self.settings,
        )?;

        Ok((target, orchestrator))
    }

    async fn execute(
        &mut self,
        scan_id: i64,
        target: &ScanTarget,
        orchestrator: &Orchestrator,
        cancel: CancellationToken,
    ) -> Result<()> {
        let crawler = &self.settings.crawler;
        let frontier = Frontier::new(
            Arc::clone(&self.fetcher),
            crawler.max_workers,
            crawler.link_fanout,
        );

        // leaving early for any reason stops the crawl
        let crawl_cancel = cancel.child_token();
        let _crawl_guard = crawl_cancel.clone().drop_guard();
        // URLs the frontier has committed to fetch, ahead of processing
        let found = frontier.scheduled();
        let (pages, crawl) = frontier.crawl(target, crawl_cancel);

        let prefs = &target.preferences;
        let checked = stream::unfold(pages, |mut pages| async move {
            pages.recv().await.map(|page| (page, pages))
        })
        .map(|page| async move {
            let findings = orchestrator.run_checks(&page, prefs).await;
            (page, findings)
        })
        .buffer_unordered(crawler.check_concurrency.max(1));
        futures::pin_mut!(checked);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AuditError::Cancelled(scan_id)),
                next = checked.next() => next,
            };
            let Some((page, findings)) = next else {
                break;
            };

            let counters = self.store.record_page(
                scan_id,
                &page,
                &findings,
                found.load(Ordering::SeqCst),
            )?;
            self.progress.send_replace(Some(ProgressSnapshot {
                scan_id,
                status: ScanStatus::Running,
                pages_found: counters.pages_found,
                pages_processed: counters.pages_processed,
                errors_found: counters.errors_found,
            }));
        }

        match crawl.await {
            Ok(stats) => info!(
                "Crawl for scan {} finished: {} pages ({} failed), max depth {}",
                scan_id, stats.pages_emitted, stats.pages_failed, stats.max_depth_reached
            ),
            Err(e) => warn!("Crawl task for scan {} ended abnormally: {}", scan_id, e),
        }

        Ok(())
    }

    /// Applies a terminal transition and publishes it
    fn finish(
        &mut self,
        scan_id: i64,
        from: ScanStatus,
        to: ScanStatus,
        cause: Option<&AuditError>,
    ) -> Result<()> {
        from.transition(to)?;
        let message = cause.map(|e| e.to_string());
        self.store
            .update_scan_status(scan_id, from, to, message.as_deref())?;
        self.publish(scan_id)
    }

    fn publish(&self, scan_id: i64) -> Result<()> {
        let scan = self.store.get_scan(scan_id)?;
        self.progress.send_replace(Some(scan.progress()));
        Ok(())
    }
}
