use crate::UrlError;
use url::Url;

/// Normalizes a URL into the dedup key used by the crawl frontier
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host (done by the parser) and keep an explicit port
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash, including the root slash
/// 5. Drop the query string and the fragment
///
/// The result has the shape `scheme://host[:port]/path` and normalizing it
/// again yields the same string.
///
/// # Examples
///
/// ```
/// use site_audit::url::normalize_url;
///
/// assert_eq!(normalize_url("http://A.com/x/").unwrap(), "http://a.com/x");
/// assert_eq!(normalize_url("http://a.com/x#frag").unwrap(), "http://a.com/x");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(url: &Url) -> Result<String, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host.to_lowercase(), port),
        None => host.to_lowercase(),
    };

    Ok(format!(
        "{}://{}{}",
        url.scheme(),
        authority,
        normalize_path(url.path())
    ))
}

/// Normalizes a URL path by removing dot segments and trailing slashes
///
/// The root path normalizes to the empty string.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return String::new();
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_root_slash_removed() {
        assert_eq!(normalize_url("https://example.com/").unwrap(), "https://example.com");
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com");
    }

    #[test]
    fn test_fragment_and_trailing_slash_collapse() {
        assert_eq!(
            normalize_url("http://a.com/x#frag").unwrap(),
            normalize_url("http://a.com/x/").unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "http://a.com/x#frag",
            "https://EXAMPLE.com/a/../b/./c/",
            "http://127.0.0.1:8080/",
            "https://example.com/шлях/сторінка/",
            "https://example.com/page?b=2&a=1",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_query_dropped() {
        let result = normalize_url("https://example.com/page?utm_source=x&id=3").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_scheme_preserved() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result, "http://example.com/page");
    }

    #[test]
    fn test_explicit_port_kept() {
        let result = normalize_url("http://127.0.0.1:3000/about/").unwrap();
        assert_eq!(result, "http://127.0.0.1:3000/about");
    }

    #[test]
    fn test_default_port_dropped() {
        let result = normalize_url("https://example.com:443/a").unwrap();
        assert_eq!(result, "https://example.com/a");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result, "https://example.com/b/c");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result, "https://example.com/Page");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///path//to///page").unwrap();
        assert_eq!(result, "https://example.com/path/to/page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
    }
}
