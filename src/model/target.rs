use crate::url::site_authority;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Per-website audit preferences
///
/// Stored as JSON on the website record. Keys missing from stored JSON fall
/// back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub spelling: bool,
    pub addresses: bool,
    pub links: bool,
    pub phones: bool,
    pub seo: bool,
    pub max_pages: usize,
    pub max_depth: u32,
    pub exclude_paths: Vec<String>,
    pub whitelist_words: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            spelling: true,
            addresses: true,
            links: true,
            phones: true,
            seo: true,
            max_pages: 100,
            max_depth: 5,
            exclude_paths: Vec::new(),
            whitelist_words: Vec::new(),
        }
    }
}

/// Everything one scan needs to know about the site it audits
///
/// Immutable for the duration of a scan.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub root_url: Url,
    /// Lowercase host plus explicit port, compared exactly against link hosts
    pub domain: String,
    pub preferences: Preferences,
}

impl ScanTarget {
    pub fn new(root_url: Url, preferences: Preferences) -> Result<Self, UrlError> {
        if root_url.scheme() != "http" && root_url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(root_url.scheme().to_string()));
        }
        let domain = site_authority(&root_url).ok_or(UrlError::MissingDomain)?;

        Ok(Self {
            root_url,
            domain,
            preferences,
        })
    }

    /// Parses the root URL and builds a target from it
    pub fn parse(root_url: &str, preferences: Preferences) -> Result<Self, UrlError> {
        let url = Url::parse(root_url).map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::new(url, preferences)
    }
}
