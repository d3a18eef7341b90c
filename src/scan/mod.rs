//! Scan lifecycle
//!
//! Registers websites and scans, and drives a pending scan to a terminal state.

mod controller;

pub use controller::ScanController;

use crate::model::{Preferences, ScanTarget};
use crate::storage::ScanStore;
use crate::url::normalize_parsed;
use crate::Result;
use tracing::info;

/// Registers (or updates) a website and creates a pending scan for it
///
/// The website is keyed by its normalized root URL. An existing website gets
/// the new preferences and name is left as first registered.
///
/// # Returns
///
/// The ID of the new pending scan
pub fn schedule_scan<S: ScanStore>(
    store: &mut S,
    root_url: &str,
    name: Option<&str>,
    preferences: Preferences,
    config_hash: &str,
) -> Result<i64> {
    let target = ScanTarget::parse(root_url, preferences)?;
    let url = normalize_parsed(&target.root_url)?;

    let website_id = match store.find_website_by_url(&url)? {
        Some(website) => {
            store.update_preferences(website.id, &target.preferences)?;
            website.id
        }
        None => store.create_website(&url, &target.domain, name, &target.preferences)?,
    };

    let scan_id = store.create_scan(website_id, config_hash)?;
    info!("Scheduled scan {} for {}", scan_id, url);
    Ok(scan_id)
}
