//! Crawl tests: the frontier driving the HTTP fetcher against a mock site

use crate::{mount_page, test_settings};
use site_audit::crawler::{build_http_client, Frontier, HttpFetcher};
use site_audit::{FetchedPage, PageStatus, Preferences, ScanTarget};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

async fn crawl_site(server: &MockServer, preferences: Preferences) -> Vec<FetchedPage> {
    let client = build_http_client(&test_settings(":memory:")).unwrap();
    let frontier = Frontier::new(Arc::new(HttpFetcher::new(client)), 3, 20);
    let target = ScanTarget::parse(&server.uri(), preferences).unwrap();

    let (mut pages, handle) = frontier.crawl(&target, CancellationToken::new());
    let mut received = Vec::new();
    while let Some(page) = pages.recv().await {
        received.push(page);
    }

    let stats = handle.await.unwrap();
    assert_eq!(stats.pages_emitted, received.len());
    received
}

fn paths(pages: &[FetchedPage]) -> Vec<String> {
    let mut paths: Vec<String> = pages.iter().map(|p| p.url.path().to_string()).collect();
    paths.sort();
    paths
}

#[tokio::test]
async fn test_crawl_respects_page_and_depth_bounds() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/a">A</a><a href="/b">B</a><a href="/c">C</a><a href="/d">D</a>
        </body></html>"#,
    )
    .await;
    for route in ["/a", "/b", "/c", "/d"] {
        mount_page(
            &server,
            route,
            r#"<html><body><a href="/deeper">Далі</a></body></html>"#,
        )
        .await;
    }

    let prefs = Preferences {
        max_pages: 3,
        max_depth: 1,
        ..Preferences::default()
    };
    let pages = crawl_site(&server, prefs).await;

    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.depth <= 1));
    assert_eq!(paths(&pages), vec!["/", "/a", "/b"]);
}

#[tokio::test]
async fn test_crawl_stays_on_site() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="http://elsewhere.invalid/page">Чужий сайт</a>
            <a href="mailto:info@example.com">Пошта</a>
            <a href="/contacts#map">Контакти</a>
            <a href="/contacts">Контакти ще раз</a>
        </body></html>"#,
    )
    .await;
    mount_page(&server, "/contacts", "<html><body>Київ</body></html>").await;

    let pages = crawl_site(&server, Preferences::default()).await;

    assert_eq!(paths(&pages), vec!["/", "/contacts"]);
}

#[tokio::test]
async fn test_crawl_skips_excluded_paths() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/admin/login">Вхід</a><a href="/news">Новини</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/news", "<html><body>Новини</body></html>").await;
    mount_page(&server, "/admin/login", "<html><body>Вхід</body></html>").await;

    let prefs = Preferences {
        exclude_paths: vec!["admin".to_string()],
        ..Preferences::default()
    };
    let pages = crawl_site(&server, prefs).await;

    assert_eq!(paths(&pages), vec!["/", "/news"]);
}

#[tokio::test]
async fn test_failed_pages_are_emitted_without_links() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/gone">Стара сторінка</a></body></html>"#,
    )
    .await;

    let pages = crawl_site(&server, Preferences::default()).await;
    assert_eq!(pages.len(), 2);

    let gone = pages.iter().find(|p| p.url.path() == "/gone").unwrap();
    assert_eq!(gone.status, PageStatus::Http(404));
    assert_eq!(gone.depth, 1);
    assert!(gone.links.is_empty());
    assert!(gone.html.is_empty());
}
