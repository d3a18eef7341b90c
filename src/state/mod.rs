//! State module for tracking scan progress
//!
//! # Components
//!
//! - `ScanStatus`: lifecycle state machine of one scan run
//! - `ProgressSnapshot`: counters published to pollers after each page

mod progress;
mod scan_status;

pub use progress::ProgressSnapshot;
pub use scan_status::ScanStatus;
