//! Crawler module for web page fetching and processing
//!
//! This module contains the crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` trait
//! - HTML parsing for text, links and metadata
//! - The crawl frontier: work queue, visited set and bounded worker pool

mod fetcher;
mod frontier;
mod parser;

pub use fetcher::{build_http_client, classify_error, HttpFetcher, PageFetcher, MAX_REDIRECTS};
pub use frontier::{CrawlStats, Frontier};
pub use parser::{anchors, head_meta, parse_html, resolve_link, Anchor, HeadMeta, ParsedPage};
