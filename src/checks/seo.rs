//! SEO inspector
//!
//! Per-page head checks (favicon, title, description, viewport, charset) and
//! one site-level robots.txt check attached to the root page.

use crate::checks::{CheckResult, PageCheck};
use crate::crawler::head_meta;
use crate::model::{FetchedPage, Finding, FindingKind, Preferences, ScanTarget, Severity};
use crate::robots::fetch_robots;
use crate::url::origin_of;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Recommended title length in characters
pub const TITLE_LENGTH: RangeInclusive<usize> = 30..=60;

/// Accepted meta description length in characters
pub const DESCRIPTION_LENGTH: RangeInclusive<usize> = 50..=160;

/// Checks head metadata and site-root files
pub struct SeoInspector {
    client: Client,
    target: ScanTarget,
    /// `/favicon.ico` probe result per origin
    favicons: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
}

impl SeoInspector {
    pub fn new(client: Client, target: ScanTarget) -> Self {
        Self {
            client,
            target,
            favicons: Mutex::new(HashMap::new()),
        }
    }

    /// Runs every per-page check
    pub async fn check_page(&self, page: &FetchedPage) -> Vec<Finding> {
        let meta = head_meta(&page.html);
        let mut findings = Vec::new();

        let linked_icon = page.has_favicon || meta.favicon_href.is_some();
        if !linked_icon && !self.favicon_file_exists(page).await {
            findings.push(
                seo(
                    Severity::Warning,
                    "Відсутній favicon",
                    "Додайте <link rel=\"icon\" href=\"/favicon.ico\"> у <head> або розмістіть файл /favicon.ico",
                )
                .with_rule("seo_favicon_missing"),
            );
        }

        let title = meta.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match title {
            None => findings.push(
                seo(
                    Severity::Error,
                    "Відсутній тег <title>",
                    "Додайте <title>Назва сторінки</title> у <head>",
                )
                .with_rule("seo_title_missing"),
            ),
            Some(title) => {
                let length = title.chars().count();
                if !TITLE_LENGTH.contains(&length) {
                    let (message, rule) = if length < *TITLE_LENGTH.start() {
                        ("Занадто короткий title", "seo_title_short")
                    } else {
                        ("Занадто довгий title", "seo_title_long")
                    };
                    findings.push(
                        seo(
                            Severity::Warning,
                            format!("{} ({} символів)", message, length),
                            "Рекомендована довжина: 30-60 символів",
                        )
                        .with_context(title)
                        .with_rule(rule),
                    );
                }
            }
        }

        let description = meta
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        match description {
            None => findings.push(
                seo(
                    Severity::Warning,
                    "Відсутній meta description",
                    "Додайте <meta name=\"description\" content=\"Опис сторінки\">",
                )
                .with_rule("seo_description_missing"),
            ),
            Some(description) => {
                let length = description.chars().count();
                if !DESCRIPTION_LENGTH.contains(&length) {
                    let (message, rule) = if length < *DESCRIPTION_LENGTH.start() {
                        ("Занадто короткий meta description", "seo_description_short")
                    } else {
                        ("Занадто довгий meta description", "seo_description_long")
                    };
                    findings.push(
                        seo(
                            Severity::Info,
                            format!("{} ({} символів)", message, length),
                            "Рекомендована довжина: 120-160 символів",
                        )
                        .with_rule(rule),
                    );
                }
            }
        }

        if !meta.has_viewport {
            findings.push(
                seo(
                    Severity::Warning,
                    "Відсутній meta viewport (не оптимізовано для мобільних)",
                    "Додайте <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
                )
                .with_rule("seo_viewport_missing"),
            );
        }

        if !meta.has_charset {
            findings.push(
                seo(
                    Severity::Warning,
                    "Відсутнє визначення кодування (charset)",
                    "Додайте <meta charset=\"UTF-8\">",
                )
                .with_rule("seo_charset_missing"),
            );
        }

        findings
    }

    /// Checks robots.txt at the target's origin
    ///
    /// A missing file yields an info finding; a file that closes the whole site
    /// to crawlers yields a critical one.
    pub async fn check_site_level(&self, target: &ScanTarget) -> Vec<Finding> {
        let Some(origin) = origin_of(&target.root_url) else {
            return Vec::new();
        };

        let Some(robots) = fetch_robots(&self.client, &origin).await else {
            return vec![seo(
                Severity::Info,
                "Файл robots.txt не знайдено",
                "Створіть файл robots.txt для контролю індексації",
            )
            .with_rule("seo_robots_missing")];
        };

        if robots.sitemaps().is_empty() {
            info!("robots.txt at {} declares no sitemap", origin);
        }

        if robots.blocks_all_agents() {
            return vec![seo(
                Severity::Critical,
                "Сайт заблокований для всіх роботів (Disallow: /)",
                "Перевірте robots.txt - можливо, сайт не буде індексуватися пошуковими системами",
            )
            .with_rule("seo_robots_blocks_all")];
        }

        Vec::new()
    }

    /// Probes `/favicon.ico` at the page's origin once per origin
    async fn favicon_file_exists(&self, page: &FetchedPage) -> bool {
        let Some(origin) = origin_of(&page.url) else {
            return false;
        };

        let cell = {
            let mut favicons = self.favicons.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(favicons.entry(origin.clone()).or_default())
        };

        *cell
            .get_or_init(|| async {
                let url = format!("{}/favicon.ico", origin);
                match self.client.head(&url).send().await {
                    Ok(response) => response.status() == StatusCode::OK,
                    Err(e) => {
                        debug!("favicon probe failed for {}: {}", url, e);
                        false
                    }
                }
            })
            .await
    }
}

fn seo(severity: Severity, message: impl Into<String>, suggestion: &str) -> Finding {
    Finding::new(FindingKind::Seo, severity, message).with_suggestion(suggestion)
}

#[async_trait]
impl PageCheck for SeoInspector {
    fn name(&self) -> &'static str {
        "seo"
    }

    fn kind(&self) -> FindingKind {
        FindingKind::Seo
    }

    fn applicable(&self, page: &FetchedPage, prefs: &Preferences) -> bool {
        prefs.seo && !page.html.trim().is_empty()
    }

    async fn run(&self, page: &FetchedPage) -> CheckResult<Vec<Finding>> {
        let mut findings = self.check_page(page).await;
        if page.depth == 0 {
            findings.extend(self.check_site_level(&self.target).await);
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageStatus;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GOOD_HEAD: &str = r#"<html><head>
        <meta charset="utf-8">
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
        <title>Інтернет-магазин побутової техніки у Києві</title>
        <meta name="description" content="Побутова техніка з доставкою по Україні. Гарантія, сервіс та консультації від фахівців щодня.">
        <link rel="icon" href="/icon.png">
        </head><body>Привіт</body></html>"#;

    fn inspector(base: &str) -> SeoInspector {
        let target = ScanTarget::parse(base, Preferences::default()).unwrap();
        SeoInspector::new(Client::new(), target)
    }

    fn page(base: &str, html: &str, depth: u32) -> FetchedPage {
        FetchedPage::with_markup(
            Url::parse(base).unwrap(),
            PageStatus::Http(200),
            depth,
            html.to_string(),
        )
    }

    fn rules(findings: &[Finding]) -> Vec<&str> {
        findings.iter().filter_map(|f| f.rule_id.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_well_formed_head_has_no_findings() {
        let server = MockServer::start().await;
        let seo = inspector(&server.uri());
        let findings = seo.check_page(&page(&server.uri(), GOOD_HEAD, 1)).await;
        assert!(findings.is_empty(), "unexpected: {:?}", rules(&findings));
    }

    #[tokio::test]
    async fn test_empty_head_reports_everything() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/favicon.ico"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let seo = inspector(&server.uri());
        let findings = seo
            .check_page(&page(&server.uri(), "<html><body>текст</body></html>", 1))
            .await;

        assert_eq!(
            rules(&findings),
            vec![
                "seo_favicon_missing",
                "seo_title_missing",
                "seo_description_missing",
                "seo_viewport_missing",
                "seo_charset_missing",
            ]
        );
        let title = findings.iter().find(|f| f.rule_id.as_deref() == Some("seo_title_missing"));
        assert_eq!(title.unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_favicon_file_probe_is_memoized() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/favicon.ico"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let seo = inspector(&server.uri());
        let html = GOOD_HEAD.replace(r#"<link rel="icon" href="/icon.png">"#, "");
        for p in ["/", "/a", "/b"] {
            let findings = seo
                .check_page(&page(&format!("{}{}", server.uri(), p), &html, 1))
                .await;
            assert!(!rules(&findings).contains(&"seo_favicon_missing"));
        }
    }

    #[tokio::test]
    async fn test_title_and_description_lengths() {
        let server = MockServer::start().await;
        let seo = inspector(&server.uri());
        let html = r#"<html><head><meta charset="utf-8">
            <meta name="viewport" content="width=device-width">
            <link rel="shortcut icon" href="/f.ico">
            <title>Головна</title>
            <meta name="description" content="Коротко">
            </head></html>"#;

        let findings = seo.check_page(&page(&server.uri(), html, 1)).await;
        assert_eq!(rules(&findings), vec!["seo_title_short", "seo_description_short"]);
        assert_eq!(findings[0].message, "Занадто короткий title (7 символів)");
        assert_eq!(findings[1].severity, Severity::Info);

        let long_title = "Дуже довгий заголовок ".repeat(4);
        let html = html.replace("Головна", &long_title);
        let findings = seo.check_page(&page(&server.uri(), &html, 1)).await;
        assert!(rules(&findings).contains(&"seo_title_long"));
    }

    #[tokio::test]
    async fn test_missing_robots_is_info() {
        let server = MockServer::start().await;
        let seo = inspector(&server.uri());
        let target = ScanTarget::parse(&server.uri(), Preferences::default()).unwrap();

        let findings = seo.check_site_level(&target).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].message, "Файл robots.txt не знайдено");
    }

    #[tokio::test]
    async fn test_robots_blocking_everyone_is_critical() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
            .mount(&server)
            .await;

        let seo = inspector(&server.uri());
        let findings = seo.run(&page(&server.uri(), GOOD_HEAD, 0)).await.unwrap();
        assert_eq!(rules(&findings), vec!["seo_robots_blocks_all"]);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_site_level_only_on_root_page() {
        let server = MockServer::start().await;
        let seo = inspector(&server.uri());
        let findings = seo
            .run(&page(&format!("{}/deep", server.uri()), GOOD_HEAD, 2))
            .await
            .unwrap();
        assert!(findings.is_empty());
    }
}
