use url::Url;

/// Extracts the site authority from a URL
///
/// The authority is the lowercase host followed by `:port` when the URL names
/// a non-default port. Two URLs belong to the same site exactly when their
/// authorities are equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_audit::url::site_authority;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(site_authority(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(site_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn site_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns `scheme://authority` for a URL, used to address site-root files
/// such as `/robots.txt` and `/favicon.ico`
pub fn origin_of(url: &Url) -> Option<String> {
    site_authority(url).map(|authority| format!("{}://{}", url.scheme(), authority))
}
