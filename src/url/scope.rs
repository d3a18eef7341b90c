use crate::model::ScanTarget;
use crate::url::domain::site_authority;
use url::Url;

/// Path suffixes that never lead to an HTML document
const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".zip", ".tar", ".gz", ".doc", ".docx",
    ".xls", ".xlsx", ".ppt", ".pptx", ".mp3", ".mp4", ".avi",
];

/// Decides which discovered URLs a scan may follow
///
/// Visited-set membership is tracked by the frontier itself; this policy only
/// covers the per-URL rules plus the page budget comparison.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    domain: String,
    max_pages: usize,
    max_depth: u32,
    exclude_paths: Vec<String>,
}

impl ScopePolicy {
    pub fn for_target(target: &ScanTarget) -> Self {
        let exclude_paths = target
            .preferences
            .exclude_paths
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                if p.starts_with('/') {
                    p.to_string()
                } else {
                    format!("/{}", p)
                }
            })
            .collect();

        Self {
            domain: target.domain.clone(),
            max_pages: target.preferences.max_pages,
            max_depth: target.preferences.max_depth,
            exclude_paths,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Returns true while fewer than `max_pages` URLs have been scheduled
    pub fn has_budget(&self, visited: usize) -> bool {
        visited < self.max_pages
    }

    /// Checks scheme, extension, domain, excluded paths and depth for a candidate
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute candidate URL
    /// * `depth` - Depth the candidate would be fetched at
    pub fn admits(&self, url: &Url, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let path = url.path().to_lowercase();
        if SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return false;
        }

        if site_authority(url).as_deref() != Some(self.domain.as_str()) {
            return false;
        }

        !self
            .exclude_paths
            .iter()
            .any(|prefix| url.path().starts_with(prefix.as_str()))
    }
}
