//! URL handling module for Site-Audit
//!
//! This module provides URL normalization (the frontier's dedup key), site
//! authority extraction, and the scope policy deciding which links a scan follows.

mod domain;
mod normalize;
mod scope;

pub use domain::{origin_of, site_authority};
pub use normalize::{normalize_parsed, normalize_url};
pub use scope::ScopePolicy;
