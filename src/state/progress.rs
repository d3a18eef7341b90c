use crate::state::ScanStatus;

/// Point-in-time view of a scan's counters, published after every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub scan_id: i64,
    pub status: ScanStatus,
    pub pages_found: u64,
    pub pages_processed: u64,
    pub errors_found: u64,
}

impl ProgressSnapshot {
    pub fn new(scan_id: i64, status: ScanStatus) -> Self {
        Self {
            scan_id,
            status,
            pages_found: 0,
            pages_processed: 0,
            errors_found: 0,
        }
    }

    /// `pages_processed / pages_found * 100`, or 0 when nothing was found yet
    pub fn progress_percent(&self) -> f64 {
        if self.pages_found == 0 {
            return 0.0;
        }
        self.pages_processed as f64 / self.pages_found as f64 * 100.0
    }
}
