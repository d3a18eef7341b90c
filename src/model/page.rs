use std::fmt;
use url::Url;

/// Outcome of fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    /// The server answered with this HTTP status
    Http(u16),
    /// The request did not finish within the configured timeout
    Timeout,
    /// Connection, TLS or protocol failure
    TransportError(String),
}

impl PageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, PageStatus::Http(code) if (200..300).contains(code))
    }

    /// HTTP status code, if the server answered at all
    pub fn code(&self) -> Option<u16> {
        match self {
            PageStatus::Http(code) => Some(*code),
            _ => None,
        }
    }

    /// Human-readable failure description, `None` for HTTP answers
    pub fn error_message(&self) -> Option<&str> {
        match self {
            PageStatus::Http(_) => None,
            PageStatus::Timeout => Some("Request timed out"),
            PageStatus::TransportError(message) => Some(message.as_str()),
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Http(code) => write!(f, "HTTP {}", code),
            PageStatus::Timeout => write!(f, "timeout"),
            PageStatus::TransportError(message) => write!(f, "transport error: {}", message),
        }
    }
}

/// A page as produced by the fetcher
///
/// Failed fetches carry only `url`, `status` and `depth`.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: PageStatus,
    pub title: Option<String>,
    pub html: String,
    pub text: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub has_favicon: bool,
    pub depth: u32,
    /// Absolute http(s) link targets in document order
    pub links: Vec<Url>,
}

impl FetchedPage {
    /// Builds a page that carries no content
    pub fn failed(url: Url, status: PageStatus, depth: u32) -> Self {
        Self {
            url,
            status,
            title: None,
            html: String::new(),
            text: String::new(),
            description: None,
            keywords: None,
            has_favicon: false,
            depth,
            links: Vec::new(),
        }
    }

    /// Builds an empty successful page to be filled in by the parser
    pub fn with_markup(url: Url, status: PageStatus, depth: u32, html: String) -> Self {
        Self {
            html,
            ..Self::failed(url, status, depth)
        }
    }
}
