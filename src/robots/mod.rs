//! Robots.txt handling module
//!
//! This module fetches and parses a site's robots.txt so the SEO inspector can
//! report a missing file or a site closed to all crawlers.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use tracing::debug;

/// Fetches robots.txt from a site origin
///
/// # Arguments
///
/// * `client` - The shared HTTP client (carries the request timeout)
/// * `origin` - `scheme://authority` of the site, without trailing slash
///
/// # Returns
///
/// * `Some(ParsedRobots)` - The file exists (2xx answer)
/// * `None` - Any other status, a transport failure, or an unreadable body
pub async fn fetch_robots(client: &Client, origin: &str) -> Option<ParsedRobots> {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("robots.txt fetch failed for {}: {}", robots_url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        debug!("robots.txt at {} answered {}", robots_url, response.status());
        return None;
    }

    match response.text().await {
        Ok(body) => Some(ParsedRobots::from_content(&body)),
        Err(e) => {
            debug!("robots.txt body unreadable at {}: {}", robots_url, e);
            None
        }
    }
}
