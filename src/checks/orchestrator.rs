//! Check orchestrator
//!
//! Holds the checkers built for one scan and runs the applicable ones over a
//! page concurrently. Results keep registry order, and a checker that errors or
//! panics is reduced to a single warning finding.

use crate::checks::{
    AddressCheck, CheckResult, GrammarAdapter, GrammarCheck, LinkChecker, PageCheck, PhoneCheck,
    SeoInspector,
};
use crate::config::Settings;
use crate::model::{FetchedPage, Finding, Preferences, ScanTarget, Severity};
use futures::future::join_all;
use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Runs a fixed registry of checkers over pages
pub struct Orchestrator {
    checks: Vec<Box<dyn PageCheck>>,
}

impl Orchestrator {
    pub fn new(checks: Vec<Box<dyn PageCheck>>) -> Self {
        Self { checks }
    }

    /// Builds the standard registry for one scan
    ///
    /// Order: spelling, addresses, links, phones, seo. The link checker and SEO
    /// inspector are created here so their probe caches live exactly as long as
    /// the scan.
    pub fn for_target(
        target: &ScanTarget,
        client: Client,
        grammar: Arc<GrammarAdapter>,
        settings: &Settings,
    ) -> CheckResult<Self> {
        let checks: Vec<Box<dyn PageCheck>> = vec![
            Box::new(GrammarCheck::new(
                grammar,
                target.preferences.whitelist_words.clone(),
            )),
            Box::new(AddressCheck::new()?),
            Box::new(LinkChecker::new(
                client.clone(),
                settings.crawler.link_probe_concurrency,
            )),
            Box::new(PhoneCheck::new()?),
            Box::new(SeoInspector::new(client, target.clone())),
        ];

        Ok(Self::new(checks))
    }

    /// Names of the registered checkers, in registry order
    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Runs every applicable checker on a page
    ///
    /// Every returned finding is tagged with the page URL.
    pub async fn run_checks(&self, page: &FetchedPage, prefs: &Preferences) -> Vec<Finding> {
        let runs = self
            .checks
            .iter()
            .filter(|check| check.applicable(page, prefs))
            .map(|check| run_guarded(check.as_ref(), page));

        let findings: Vec<Finding> = join_all(runs)
            .await
            .into_iter()
            .flatten()
            .map(|finding| finding.on_page(&page.url))
            .collect();

        debug!("{} findings on {}", findings.len(), page.url);
        findings
    }
}

async fn run_guarded(check: &dyn PageCheck, page: &FetchedPage) -> Vec<Finding> {
    match AssertUnwindSafe(check.run(page)).catch_unwind().await {
        Ok(Ok(findings)) => findings,
        Ok(Err(e)) => {
            warn!("Checker {} failed on {}: {}", check.name(), page.url, e);
            vec![failure_finding(check, &e.to_string())]
        }
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            error!("Checker {} panicked on {}: {}", check.name(), page.url, detail);
            vec![failure_finding(check, &detail)]
        }
    }
}

fn failure_finding(check: &dyn PageCheck, detail: &str) -> Finding {
    Finding::new(
        check.kind(),
        Severity::Warning,
        format!("Перевірку \"{}\" не виконано: {}", check.name(), detail),
    )
    .with_rule("checker_failed")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
