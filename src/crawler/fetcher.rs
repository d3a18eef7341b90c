//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the shared HTTP client with the configured user agent and timeout
//! - GET requests with redirects followed (up to 10 hops)
//! - Error classification into page statuses
//! - Handing successful bodies to the parser

use crate::config::Settings;
use crate::crawler::parser::parse_html;
use crate::model::{FetchedPage, PageStatus};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Maximum redirect hops followed by every request
pub const MAX_REDIRECTS: usize = 10;

/// Retrieves one URL and turns the response into a [`FetchedPage`]
///
/// Implementations never fail: transport problems are recorded in the page status.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, depth: u32) -> FetchedPage;
}

/// Builds an HTTP client with proper configuration
///
/// The same client is shared by the fetcher, the link checker, the SEO probes
/// and the grammar oracle, so every network call carries the configured timeout.
///
/// # Arguments
///
/// * `settings` - The loaded configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(settings: &Settings) -> Result<Client, reqwest::Error> {
    let timeout = settings.crawler.request_timeout();

    Client::builder()
        .user_agent(settings.user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a reqwest error to the page status recorded for it
pub fn classify_error(error: &reqwest::Error) -> PageStatus {
    if error.is_timeout() {
        PageStatus::Timeout
    } else if error.is_connect() {
        PageStatus::TransportError(format!("Connection failed: {}", error))
    } else {
        PageStatus::TransportError(error.to_string())
    }
}

/// Fetches pages over HTTP with a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a URL and parses it
    ///
    /// # Request Flow
    ///
    /// | Condition            | Result                                  |
    /// |----------------------|-----------------------------------------|
    /// | 2xx                  | parsed page, links resolved vs final URL |
    /// | any other status     | url/status only                         |
    /// | timeout              | `PageStatus::Timeout`                   |
    /// | connection/TLS error | `PageStatus::TransportError`            |
    /// | parse failure        | raw markup, empty structured fields     |
    async fn fetch(&self, url: &Url, depth: u32) -> FetchedPage {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                let status = classify_error(&e);
                debug!("Fetch failed for {}: {}", url, status);
                return FetchedPage::failed(url.clone(), status, depth);
            }
        };

        let status = PageStatus::Http(response.status().as_u16());
        if !status.is_success() {
            debug!("Non-success status for {}: {}", url, status);
            return FetchedPage::failed(url.clone(), status, depth);
        }

        let final_url = response.url().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read body of {}: {}", url, e);
                return FetchedPage::failed(url.clone(), classify_error(&e), depth);
            }
        };

        match parse_html(&body, &final_url) {
            Ok(parsed) => FetchedPage {
                url: url.clone(),
                status,
                title: parsed.title,
                html: body,
                text: parsed.text,
                description: parsed.description,
                keywords: parsed.keywords,
                has_favicon: parsed.has_favicon,
                depth,
                links: parsed.links,
            },
            Err(e) => {
                warn!("Failed to parse {}: {}", url, e);
                FetchedPage::with_markup(url.clone(), status, depth, body)
            }
        }
    }
}
