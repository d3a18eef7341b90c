//! Scan tests: scheduling, running and reporting whole scans against a mock site

use crate::{mount_page, test_settings};
use site_audit::checks::GrammarAdapter;
use site_audit::crawler::build_http_client;
use site_audit::output::build_report;
use site_audit::scan::schedule_scan;
use site_audit::storage::{open_storage, ScanStore, SqliteStore, StorageError};
use site_audit::{AuditError, FindingKind, Preferences, ScanController, ScanStatus, Severity};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn only(configure: impl FnOnce(&mut Preferences)) -> Preferences {
    let mut prefs = Preferences {
        spelling: false,
        addresses: false,
        links: false,
        phones: false,
        seo: false,
        ..Preferences::default()
    };
    configure(&mut prefs);
    prefs
}

fn controller(store: SqliteStore, database: &Path) -> ScanController<SqliteStore> {
    let settings = test_settings(&database.display().to_string());
    let client = build_http_client(&settings).unwrap();
    ScanController::new(store, settings, client, Arc::new(GrammarAdapter::disabled()))
}

/// Schedules and runs one scan in a fresh database
async fn run_scan(
    dir: &TempDir,
    root: &str,
    prefs: Preferences,
) -> (ScanController<SqliteStore>, i64, Result<(), AuditError>) {
    let database = dir.path().join("audit.db");
    let mut store = open_storage(&database).unwrap();
    let scan_id = schedule_scan(&mut store, root, Some("Тест"), prefs, "hash").unwrap();

    let mut controller = controller(store, &database);
    let result = controller
        .run(scan_id, CancellationToken::new())
        .await
        .map(|_| ());
    (controller, scan_id, result)
}

#[tokio::test]
async fn test_single_broken_link_yields_one_finding() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/ok">Працює</a>
            <a href="/missing">Зламане</a>
        </body></html>"#,
    )
    .await;
    // answers both the crawl GET and the probe HEAD
    Mock::given(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body>Гаразд</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (controller, scan_id, result) =
        run_scan(&dir, &server.uri(), only(|p| p.links = true)).await;
    result.unwrap();

    let store = controller.store();
    let scan = store.get_scan(scan_id).unwrap();
    assert_eq!(scan.status, ScanStatus::Completed);
    assert_eq!(scan.pages_processed, 3);
    assert_eq!(scan.pages_found, 3);
    assert_eq!(scan.errors_found, 1);
    assert_eq!(scan.errors_found, store.count_findings(scan_id).unwrap());

    let findings = store.list_findings(scan_id).unwrap();
    assert_eq!(findings.len(), 1);
    let broken = &findings[0];
    assert_eq!(broken.kind, FindingKind::BrokenLink);
    assert_eq!(broken.severity, Severity::Error);
    assert_eq!(broken.link_status, Some(404));
    assert!(broken.link_url.as_deref().unwrap().ends_with("/missing"));
    assert_eq!(broken.context.as_deref(), Some("Зламане"));
    assert_eq!(broken.page_url, format!("{}/", server.uri()));
}

#[tokio::test]
async fn test_scan_respects_page_and_depth_bounds() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/one">1</a><a href="/two">2</a><a href="/three">3</a>
        </body></html>"#,
    )
    .await;
    for route in ["/one", "/two", "/three"] {
        mount_page(
            &server,
            route,
            r#"<html><body><a href="/nested/page">Глибше</a></body></html>"#,
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let prefs = only(|p| {
        p.max_pages = 3;
        p.max_depth = 1;
    });
    let (controller, scan_id, result) = run_scan(&dir, &server.uri(), prefs).await;
    result.unwrap();

    let pages = controller.store().list_pages(scan_id).unwrap();
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.depth <= 1));
    assert!(pages.iter().all(|p| !p.url.contains("/nested")));

    let scan = controller.store().get_scan(scan_id).unwrap();
    assert_eq!(scan.pages_processed, 3);
    assert_eq!(scan.progress().progress_percent(), 100.0);
}

#[tokio::test]
async fn test_site_level_seo_is_reported_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><head></head><body><a href="/about">Про нас</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/about", "<html><head></head><body>Про нас</body></html>").await;

    let dir = TempDir::new().unwrap();
    let (controller, scan_id, result) = run_scan(&dir, &server.uri(), only(|p| p.seo = true)).await;
    result.unwrap();

    let findings = controller.store().list_findings(scan_id).unwrap();
    let with_rule = |rule: &str| {
        findings
            .iter()
            .filter(|f| f.rule_id.as_deref() == Some(rule))
            .count()
    };

    assert_eq!(with_rule("seo_robots_missing"), 1);
    assert_eq!(with_rule("seo_title_missing"), 2);
    assert_eq!(with_rule("seo_favicon_missing"), 2);
    assert!(findings.iter().all(|f| f.kind == FindingKind::Seo));
}

#[tokio::test]
async fn test_phone_findings_through_http() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <p>Телефон: <a href="tel:+380501234567">+38 (050) 123-45-67</a></p>
            <p>Факс: 0441234567</p>
        </body></html>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (controller, scan_id, result) =
        run_scan(&dir, &server.uri(), only(|p| p.phones = true)).await;
    result.unwrap();

    let findings = controller.store().list_findings(scan_id).unwrap();
    assert!(findings.iter().all(|f| f.kind == FindingKind::Phone));
    assert!(findings
        .iter()
        .any(|f| f.rule_id.as_deref() == Some("phone_not_clickable")));
}

#[tokio::test]
async fn test_unreachable_site_completes_with_failed_root() {
    // nothing listens on port 9 of localhost
    let dir = TempDir::new().unwrap();
    let (controller, scan_id, result) = run_scan(&dir, "http://127.0.0.1:9", only(|_| {})).await;
    result.unwrap();

    let pages = controller.store().list_pages(scan_id).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status_code, None);
    assert!(pages[0].error_message.is_some());
}

#[tokio::test]
async fn test_report_survives_reopen() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<html><head></head><body>Вітаємо</body></html>").await;

    let dir = TempDir::new().unwrap();
    let (controller, scan_id, result) = run_scan(&dir, &server.uri(), only(|p| p.seo = true)).await;
    result.unwrap();
    drop(controller);

    let store = open_storage(&dir.path().join("audit.db")).unwrap();
    let report = build_report(&store, scan_id).unwrap();
    assert_eq!(report.scan.status, ScanStatus::Completed);
    assert_eq!(report.website.name.as_deref(), Some("Тест"));
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.statistics.total_findings, report.scan.errors_found);
    assert_eq!(report.findings.len() as u64, report.scan.errors_found);
}

#[tokio::test]
async fn test_delete_cascades_to_pages_and_findings() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<html><head></head><body>Вітаємо</body></html>").await;

    let dir = TempDir::new().unwrap();
    let (controller, scan_id, result) = run_scan(&dir, &server.uri(), only(|p| p.seo = true)).await;
    result.unwrap();

    let mut store = controller.into_store();
    assert!(store.count_findings(scan_id).unwrap() > 0);
    store.delete_scan(scan_id).unwrap();
    drop(store);

    let conn = rusqlite::Connection::open(dir.path().join("audit.db")).unwrap();
    let count = |table: &str| -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(count("scans"), 0);
    assert_eq!(count("pages"), 0);
    assert_eq!(count("findings"), 0);
    assert_eq!(count("websites"), 1);
}

#[tokio::test]
async fn test_missing_website_fails_scan() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("audit.db");
    let mut store = open_storage(&database).unwrap();
    let scan_id = schedule_scan(
        &mut store,
        "https://example.com",
        None,
        Preferences::default(),
        "hash",
    )
    .unwrap();
    let website_id = store.get_scan(scan_id).unwrap().website_id;
    drop(store);

    // drop the website but leave its scan behind
    let conn = rusqlite::Connection::open(&database).unwrap();
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute("DELETE FROM websites WHERE id = ?1", [website_id])
        .unwrap();
    drop(conn);

    let mut controller = controller(open_storage(&database).unwrap(), &database);
    let result = controller.run(scan_id, CancellationToken::new()).await;
    assert!(matches!(result, Err(AuditError::TargetMissing(id)) if id == scan_id));

    let scan = controller.store().get_scan(scan_id).unwrap();
    assert_eq!(scan.status, ScanStatus::Failed);
    assert!(scan.error_message.is_some());
}

#[tokio::test]
async fn test_recover_orphaned_scans() {
    let dir = TempDir::new().unwrap();
    let mut store = open_storage(&dir.path().join("audit.db")).unwrap();
    let scan_id = schedule_scan(
        &mut store,
        "https://example.com",
        None,
        Preferences::default(),
        "hash",
    )
    .unwrap();
    store
        .update_scan_status(scan_id, ScanStatus::Pending, ScanStatus::Running, None)
        .unwrap();

    assert_eq!(store.recover_orphaned().unwrap(), 1);
    let scan = store.get_scan(scan_id).unwrap();
    assert_eq!(scan.status, ScanStatus::Failed);
    assert!(scan.completed_at.is_some());

    // a failed scan cannot be moved back
    let again = store.update_scan_status(scan_id, ScanStatus::Running, ScanStatus::Completed, None);
    assert!(matches!(again, Err(StorageError::StatusConflict { .. })));
}
