//! Crawl frontier
//!
//! Explores a site's same-domain link graph under page and depth bounds. The
//! frontier owns an explicit work queue and the visited set; a bounded pool of
//! fetch tasks pulls from the queue, and every fetched page is sent to the
//! caller as soon as it arrives.

use crate::crawler::fetcher::PageFetcher;
use crate::model::{FetchedPage, ScanTarget};
use crate::url::{normalize_parsed, ScopePolicy};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// A URL awaiting fetch
///
/// `url` is the link as discovered (query kept, fragment dropped); the
/// normalized form is only the visited-set key.
#[derive(Debug, Clone)]
struct CrawlTask {
    url: Url,
    depth: u32,
}

/// Summary of one crawl, returned when the frontier finishes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages handed to the receiver
    pub pages_emitted: usize,
    /// Emitted pages whose fetch did not succeed
    pub pages_failed: usize,
    /// Distinct normalized URLs scheduled, root included
    pub urls_scheduled: usize,
    pub max_depth_reached: u32,
    pub cancelled: bool,
}

impl CrawlStats {
    fn record(&mut self, page: &FetchedPage) {
        self.pages_emitted += 1;
        if !page.status.is_success() {
            self.pages_failed += 1;
        }
        self.max_depth_reached = self.max_depth_reached.max(page.depth);
    }
}

/// Drives a [`PageFetcher`] across one site
#[derive(Clone)]
pub struct Frontier {
    fetcher: Arc<dyn PageFetcher>,
    workers: usize,
    link_fanout: usize,
    scheduled: Arc<AtomicU64>,
}

impl Frontier {
    /// Creates a frontier
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher used for every page
    /// * `workers` - Maximum number of fetches in flight
    /// * `link_fanout` - Number of outbound links expanded per page, in document order
    pub fn new(fetcher: Arc<dyn PageFetcher>, workers: usize, link_fanout: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            link_fanout,
            scheduled: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Live count of distinct URLs scheduled by the most recent crawl, root included
    ///
    /// Rises as links are discovered, ahead of the pages arriving on the receiver.
    pub fn scheduled(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.scheduled)
    }

    /// Starts crawling a target in a background task
    ///
    /// Pages arrive on the returned receiver in completion order. The stream ends
    /// when the queue is drained, the receiver is dropped, or `cancel` fires.
    /// Cancellation stops new fetches and discards results still in flight.
    ///
    /// # Returns
    ///
    /// The page receiver and a handle resolving to the crawl statistics
    pub fn crawl(
        &self,
        target: &ScanTarget,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<FetchedPage>, JoinHandle<CrawlStats>) {
        let (tx, rx) = mpsc::channel(self.workers);
        self.scheduled.store(0, Ordering::SeqCst);
        let run = CrawlRun {
            fetcher: Arc::clone(&self.fetcher),
            policy: ScopePolicy::for_target(target),
            workers: self.workers,
            link_fanout: self.link_fanout,
            scheduled: Arc::clone(&self.scheduled),
        };
        let root = target.root_url.clone();

        let handle = tokio::spawn(run.drive(root, tx, cancel));
        (rx, handle)
    }
}

struct CrawlRun {
    fetcher: Arc<dyn PageFetcher>,
    policy: ScopePolicy,
    workers: usize,
    link_fanout: usize,
    scheduled: Arc<AtomicU64>,
}

impl CrawlRun {
    async fn drive(
        self,
        root: Url,
        tx: mpsc::Sender<FetchedPage>,
        cancel: CancellationToken,
    ) -> CrawlStats {
        let mut stats = CrawlStats::default();
        let mut pending: VecDeque<CrawlTask> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut in_flight: JoinSet<FetchedPage> = JoinSet::new();

        if !self.policy.has_budget(visited.len()) {
            info!("Page budget is zero, nothing to crawl at {}", root);
            return stats;
        }

        match normalize_parsed(&root) {
            Ok(key) => {
                self.schedule(key, &root, 0, &mut pending, &mut visited);
            }
            Err(e) => {
                warn!("Root URL {} cannot be crawled: {}", root, e);
                return stats;
            }
        }

        info!("Crawl started at {}", pending[0].url);

        loop {
            while in_flight.len() < self.workers {
                let Some(task) = pending.pop_front() else {
                    break;
                };
                debug!("Dispatching {} at depth {}", task.url, task.depth);
                let fetcher = Arc::clone(&self.fetcher);
                in_flight.spawn(async move { fetcher.fetch(&task.url, task.depth).await });
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
                joined = in_flight.join_next() => joined,
            };

            let page = match joined {
                Some(Ok(page)) => page,
                Some(Err(e)) => {
                    warn!("Fetch task ended abnormally: {}", e);
                    continue;
                }
                None => break,
            };

            self.expand(&page, &mut pending, &mut visited);
            stats.record(&page);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
                sent = tx.send(page) => {
                    if sent.is_err() {
                        debug!("Page receiver dropped, stopping crawl");
                        break;
                    }
                }
            }
        }

        in_flight.abort_all();
        stats.urls_scheduled = visited.len();

        info!(
            "Crawl finished: {} pages emitted, {} failed, {} URLs scheduled{}",
            stats.pages_emitted,
            stats.pages_failed,
            stats.urls_scheduled,
            if stats.cancelled { " (cancelled)" } else { "" }
        );

        stats
    }

    /// Enqueues the first `link_fanout` admissible links of a successful page
    fn expand(
        &self,
        page: &FetchedPage,
        pending: &mut VecDeque<CrawlTask>,
        visited: &mut HashSet<String>,
    ) {
        if !page.status.is_success() || page.depth >= self.policy.max_depth() {
            return;
        }

        let depth = page.depth + 1;
        for link in page.links.iter().take(self.link_fanout) {
            if !self.policy.has_budget(visited.len()) {
                break;
            }
            if !self.policy.admits(link, depth) {
                continue;
            }
            let Ok(key) = normalize_parsed(link) else {
                continue;
            };
            if visited.contains(&key) {
                continue;
            }

            self.schedule(key, link, depth, pending, visited);
        }
    }

    /// Marks a key visited and queues the URL it was discovered as
    fn schedule(
        &self,
        key: String,
        url: &Url,
        depth: u32,
        pending: &mut VecDeque<CrawlTask>,
        visited: &mut HashSet<String>,
    ) {
        let mut url = url.clone();
        url.set_fragment(None);
        visited.insert(key);
        self.scheduled.store(visited.len() as u64, Ordering::SeqCst);
        pending.push_back(CrawlTask { url, depth });
    }
}
