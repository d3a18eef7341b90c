//! HTML parser for extracting text, links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Visible text (script, style and noscript content excluded)
//! - Links to follow (from `<a href>` tags)
//! - Page title, meta description/keywords and favicon presence
//! - Head facts used by the SEO inspector (viewport, charset)

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from `<title>` tag)
    pub title: Option<String>,

    pub description: Option<String>,

    pub keywords: Option<String>,

    /// True when the markup links an icon (`<link rel="... icon ...">`)
    pub has_favicon: bool,

    /// Visible text, pieces joined by single spaces
    pub text: String,

    /// All followable links on the page (absolute http(s) URLs, document order)
    pub links: Vec<Url>,
}

/// An `<a href>` occurrence as written in the markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Facts about the document head
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub favicon_href: Option<String>,
    pub has_viewport: bool,
    pub has_charset: bool,
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {:?}", css, e))
}

/// Parses HTML content and extracts text, links and metadata
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that is not http(s) after resolution
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(String)` - Failed to parse HTML
///
/// # Example
///
/// ```
/// use site_audit::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url).unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> Result<ParsedPage, String> {
    let document = Html::parse_document(html);
    let head = extract_head(&document)?;
    let links = extract_links(&document, base_url)?;

    Ok(ParsedPage {
        title: head.title,
        description: head.description,
        keywords: head.keywords,
        has_favicon: head.favicon_href.is_some(),
        text: visible_text(&document),
        links,
    })
}

/// Extracts head metadata from raw markup
///
/// Selector failures degrade to an empty result.
pub fn head_meta(html: &str) -> HeadMeta {
    let document = Html::parse_document(html);
    extract_head(&document).unwrap_or_default()
}

/// Lists every `<a href>` with its trimmed text, in document order
pub fn anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    let Ok(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            Some(Anchor {
                href: href.trim().to_string(),
                text: element_text(&element),
            })
        })
        .collect()
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds a `<meta name=...>` by case-insensitive name
fn find_meta<'a>(
    document: &'a Html,
    meta_selector: &Selector,
    name: &str,
) -> Option<ElementRef<'a>> {
    document.select(meta_selector).find(|e| {
        e.value()
            .attr("name")
            .map(|n| n.trim().eq_ignore_ascii_case(name))
            .unwrap_or(false)
    })
}

fn meta_content(document: &Html, meta_selector: &Selector, name: &str) -> Option<String> {
    find_meta(document, meta_selector, name)
        .and_then(|e| e.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn extract_head(document: &Html) -> Result<HeadMeta, String> {
    let title_selector = selector("title")?;
    let title = document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    let link_selector = selector("link[rel]")?;
    let favicon_href = document
        .select(&link_selector)
        .find(|e| {
            e.value()
                .attr("rel")
                .map(|rel| rel.to_lowercase().contains("icon"))
                .unwrap_or(false)
        })
        .map(|e| e.value().attr("href").unwrap_or_default().to_string());

    let meta_selector = selector("meta")?;
    let has_charset = document.select(&meta_selector).any(|e| {
        e.value().attr("charset").is_some()
            || e.value()
                .attr("http-equiv")
                .map(|v| v.eq_ignore_ascii_case("content-type"))
                .unwrap_or(false)
    });

    Ok(HeadMeta {
        title,
        description: meta_content(document, &meta_selector, "description"),
        keywords: meta_content(document, &meta_selector, "keywords"),
        favicon_href,
        has_viewport: find_meta(document, &meta_selector, "viewport").is_some(),
        has_charset,
    })
}

/// Collects text nodes outside script, style and noscript elements
fn visible_text(document: &Html) -> String {
    let mut pieces: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }

    pieces.join(" ")
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<Url>, String> {
    let a_selector = selector("a[href]")?;

    Ok(document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only and empty hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="https://other.com/page">Other</a>
            <a href="/other">Local</a>
            <a href="sub">Relative</a>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        let links: Vec<&str> = parsed.links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://other.com/page",
                "https://example.com/other",
                "https://example.com/sub"
            ]
        );
    }

    #[test]
    fn test_skip_special_links() {
        let html = r##"<html><body>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="tel:+380501234567">Call</a>
            <a href="#top">Top</a>
            <a href="ftp://example.com/file">FTP</a>
            <a href="">Empty</a>
        </body></html>"##;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_visible_text_excludes_scripts() {
        let html = r#"<html><head><style>body { color: red }</style></head><body>
            <p>Привіт,   світ</p>
            <script>var x = "hidden";</script>
            <noscript>Enable JS</noscript>
            <div>Друга <b>частина</b></div>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.text, "Привіт,   світ Друга частина");
    }

    #[test]
    fn test_meta_and_favicon() {
        let html = r#"<html><head>
            <meta charset="utf-8">
            <meta name="Description" content=" Опис сторінки ">
            <meta name="keywords" content="a, b">
            <meta name="viewport" content="width=device-width">
            <link rel="shortcut icon" href="/fav.png">
        </head><body></body></html>"#;

        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.description.as_deref(), Some("Опис сторінки"));
        assert_eq!(parsed.keywords.as_deref(), Some("a, b"));
        assert!(parsed.has_favicon);

        let head = head_meta(html);
        assert!(head.has_viewport);
        assert!(head.has_charset);
        assert_eq!(head.favicon_href.as_deref(), Some("/fav.png"));
    }

    #[test]
    fn test_head_meta_missing_everything() {
        let head = head_meta("<html><body><p>bare</p></body></html>");
        assert_eq!(head, HeadMeta::default());
    }

    #[test]
    fn test_anchors_keep_text() {
        let html = r#"<a href=" tel:+380 50 123 45 67 ">Зателефонуйте <b>нам</b></a>"#;
        let found = anchors(html);
        assert_eq!(
            found,
            vec![Anchor {
                href: "tel:+380 50 123 45 67".to_string(),
                text: "Зателефонуйте нам".to_string()
            }]
        );
    }
}
