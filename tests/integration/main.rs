//! Integration tests for Site-Audit
//!
//! These tests run against wiremock servers and tempfile databases.

mod crawl_tests;
mod scan_tests;

use site_audit::config::{parse_config, Settings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Settings with a short timeout and the grammar oracle switched off
pub fn test_settings(database_path: &str) -> Settings {
    parse_config(&format!(
        r#"
[crawler]
request-timeout-secs = 2
max-workers = 3

[user-agent]
crawler-name = "TestAudit"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[storage]
database-path = "{}"

[grammar]
enabled = false
"#,
        database_path
    ))
    .expect("test config parses")
}

/// Serves `html` for GET requests to `route`
pub async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}
