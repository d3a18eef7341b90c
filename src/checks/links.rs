//! Broken link checker
//!
//! Probes every hyperlink on a page with a HEAD request. Results are memoized per
//! absolute URL for the lifetime of the checker, which is one scan: a link shared
//! by many pages is probed once, and concurrent requests for the same URL wait
//! on the same probe.

use crate::checks::{CheckResult, PageCheck};
use crate::crawler::anchors;
use crate::model::{FetchedPage, Finding, FindingKind, Preferences, Severity};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

/// Status recorded for links whose probe timed out
pub const TIMEOUT_STATUS: u16 = 408;

/// Outcome of probing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkProbe {
    /// The server answered (after redirects)
    Status(u16),
    Timeout,
    /// No answer: DNS, connection or TLS failure
    ConnectionFailed(String),
}

impl LinkProbe {
    pub fn is_broken(&self) -> bool {
        match self {
            LinkProbe::Status(code) => *code >= 400,
            LinkProbe::Timeout | LinkProbe::ConnectionFailed(_) => true,
        }
    }

    /// Status stored with the finding; timeouts count as 408, connection failures have none
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LinkProbe::Status(code) => Some(*code),
            LinkProbe::Timeout => Some(TIMEOUT_STATUS),
            LinkProbe::ConnectionFailed(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            LinkProbe::Status(code) => format!("HTTP {}", code),
            LinkProbe::Timeout => format!("HTTP {}", TIMEOUT_STATUS),
            LinkProbe::ConnectionFailed(_) => "Connection failed".to_string(),
        }
    }
}

type ProbeCell = Arc<OnceCell<LinkProbe>>;

/// Checks hyperlinks for reachability
pub struct LinkChecker {
    client: Client,
    concurrency: usize,
    memo: Mutex<HashMap<String, ProbeCell>>,
}

impl LinkChecker {
    /// Creates a checker with an empty probe cache
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (timeout and redirect policy come from it)
    /// * `concurrency` - Probes in flight per page
    pub fn new(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct URLs probed or being probed
    pub fn cached_urls(&self) -> usize {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Probes a URL once per checker lifetime
    pub async fn probe(&self, url: &Url) -> LinkProbe {
        let cell: ProbeCell = {
            let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(memo.entry(url.to_string()).or_default())
        };

        cell.get_or_init(|| self.probe_uncached(url)).await.clone()
    }

    async fn probe_uncached(&self, url: &Url) -> LinkProbe {
        debug!("Probing link {}", url);

        let probe = self.request(self.client.head(url.clone())).await;

        // some servers refuse HEAD outright; ask again with GET before calling the link broken
        match probe {
            LinkProbe::Status(code)
                if code == StatusCode::METHOD_NOT_ALLOWED.as_u16()
                    || code == StatusCode::NOT_IMPLEMENTED.as_u16() =>
            {
                self.request(self.client.get(url.clone())).await
            }
            other => other,
        }
    }

    async fn request(&self, request: reqwest::RequestBuilder) -> LinkProbe {
        match request.send().await {
            Ok(response) => LinkProbe::Status(response.status().as_u16()),
            Err(e) if e.is_timeout() => LinkProbe::Timeout,
            Err(e) => LinkProbe::ConnectionFailed(e.to_string()),
        }
    }

    /// Probes every link on a page and reports the broken ones
    ///
    /// Skips `#...`, `javascript:`, `mailto:` and `tel:` hrefs and anything that is
    /// not http(s) once resolved against the page URL. Each broken occurrence yields
    /// one finding, in document order.
    pub async fn check_all(&self, page: &FetchedPage) -> Vec<Finding> {
        let targets: Vec<(Url, String)> = anchors(&page.html)
            .into_iter()
            .filter_map(|anchor| {
                let url = resolve_probe_target(&anchor.href, &page.url)?;
                Some((url, anchor.text))
            })
            .collect();

        // boxed up front so the stream holds no borrowing closure
        let pending: Vec<_> = targets
            .iter()
            .map(|(url, _)| Box::pin(self.probe(url)))
            .collect();
        let probes: Vec<LinkProbe> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;

        targets
            .into_iter()
            .zip(probes)
            .filter(|(_, probe)| probe.is_broken())
            .map(|((url, text), probe)| {
                let context = if text.is_empty() {
                    url.to_string()
                } else {
                    text
                };
                Finding::new(
                    FindingKind::BrokenLink,
                    Severity::Error,
                    format!("Бите посилання: {} ({})", url, probe.describe()),
                )
                .with_context(context)
                .with_link(url.to_string(), probe.status_code())
                .with_rule("broken_link")
            })
            .collect()
    }
}

/// Resolves an href for probing, or `None` for hrefs that are never probed
fn resolve_probe_target(href: &str, base: &Url) -> Option<Url> {
    let lower = href.trim().to_lowercase();
    if lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return None;
    }

    let mut url = base.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

#[async_trait]
impl PageCheck for LinkChecker {
    fn name(&self) -> &'static str {
        "links"
    }

    fn kind(&self) -> FindingKind {
        FindingKind::BrokenLink
    }

    fn applicable(&self, page: &FetchedPage, prefs: &Preferences) -> bool {
        prefs.links && !page.html.trim().is_empty()
    }

    async fn run(&self, page: &FetchedPage) -> CheckResult<Vec<Finding>> {
        Ok(self.check_all(page).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageStatus;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    fn page_at(base: &str, html: &str) -> FetchedPage {
        FetchedPage::with_markup(
            Url::parse(base).unwrap(),
            PageStatus::Http(200),
            0,
            html.to_string(),
        )
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_check_future_is_send() {
        let checker = LinkChecker::new(client(), 4);
        let page = page_at("https://example.com/", r#"<a href="/a">a</a>"#);
        let run = checker.check_all(&page);
        assert_send(&run);
    }

    #[tokio::test]
    async fn test_single_404_link() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let checker = LinkChecker::new(client(), 4);
        let page = page_at(
            &format!("{}/docs/", server.uri()),
            r#"<a href="../gone">Стара сторінка</a>"#,
        );
        let findings = checker.check_all(&page).await;

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        let expected_url = format!("{}/gone", server.uri());
        assert_eq!(finding.link_url.as_deref(), Some(expected_url.as_str()));
        assert_eq!(finding.link_status, Some(404));
        assert_eq!(finding.context.as_deref(), Some("Стара сторінка"));
        assert_eq!(finding.severity, Severity::Error);
        assert!(finding.message.contains("HTTP 404"));
    }

    #[tokio::test]
    async fn test_working_and_skipped_links() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let checker = LinkChecker::new(client(), 4);
        let page = page_at(
            &server.uri(),
            r##"<a href="/ok">ok</a>
               <a href="#top">top</a>
               <a href="javascript:void(0)">js</a>
               <a href="mailto:a@b.c">mail</a>
               <a href="tel:+380501234567">tel</a>"##,
        );

        assert!(checker.check_all(&page).await.is_empty());
        assert_eq!(checker.cached_urls(), 1);
    }

    #[tokio::test]
    async fn test_repeated_links_probed_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let checker = LinkChecker::new(client(), 4);
        let html = r#"<a href="/broken">a</a><a href="/broken">b</a><a href="/broken#x">c</a>"#;
        let first = page_at(&server.uri(), html);
        let second = page_at(&format!("{}/other", server.uri()), html);

        assert_eq!(checker.check_all(&first).await.len(), 3);
        assert_eq!(checker.check_all(&second).await.len(), 3);
        // MockServer verifies the single HEAD on drop
    }

    #[tokio::test]
    async fn test_head_refused_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let checker = LinkChecker::new(client(), 4);
        let page = page_at(&server.uri(), r#"<a href="/no-head">x</a>"#);
        assert!(checker.check_all(&page).await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_408() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let checker = LinkChecker::new(client(), 4);
        let page = page_at(&server.uri(), r#"<a href="/slow">slow</a>"#);
        let findings = checker.check_all(&page).await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].link_status, Some(TIMEOUT_STATUS));
    }

    #[tokio::test]
    async fn test_connection_failure_has_no_status() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let checker = LinkChecker::new(client(), 4);
        let page = page_at(
            "https://example.com/",
            &format!(r#"<a href="http://127.0.0.1:{}/x">down</a>"#, port),
        );
        let findings = checker.check_all(&page).await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].link_status, None);
        assert!(findings[0].message.contains("Connection failed"));
    }

    #[test]
    fn test_probe_classification() {
        assert!(LinkProbe::Status(404).is_broken());
        assert!(LinkProbe::Status(500).is_broken());
        assert!(!LinkProbe::Status(200).is_broken());
        assert!(!LinkProbe::Status(301).is_broken());
        assert_eq!(LinkProbe::Timeout.status_code(), Some(408));
    }
}
