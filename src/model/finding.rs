/// Finding definitions shared by every checker
///
/// A finding is one detected issue on one page. Findings are built once by the
/// checker that produced them and never mutated afterwards, apart from the
/// orchestrator tagging the owning page.
use std::fmt;
use url::Url;

/// Which checker family produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FindingKind {
    Spelling,
    Address,
    BrokenLink,
    Phone,
    Seo,
}

impl FindingKind {
    /// Converts the kind to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Spelling => "spelling",
            Self::Address => "address",
            Self::BrokenLink => "broken_link",
            Self::Phone => "phone",
            Self::Seo => "seo",
        }
    }

    /// Parses a kind from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "spelling" => Some(Self::Spelling),
            "address" => Some(Self::Address),
            "broken_link" => Some(Self::BrokenLink),
            "phone" => Some(Self::Phone),
            "seo" => Some(Self::Seo),
            _ => None,
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::Spelling,
            Self::Address,
            Self::BrokenLink,
            Self::Phone,
            Self::Seo,
        ]
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// How serious a finding is, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Info, Self::Warning, Self::Error, Self::Critical]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// One detected issue on one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    pub context: Option<String>,
    pub suggestion: Option<String>,
    pub link_url: Option<String>,
    /// Observed HTTP status of a broken link; `None` when no response arrived
    pub link_status: Option<u16>,
    pub rule_id: Option<String>,
    pub category: Option<String>,
    /// Character offset into the page text (spelling findings)
    pub offset: Option<usize>,
    /// Owning page, set by the orchestrator
    pub page_url: Option<Url>,
}

impl Finding {
    pub fn new(kind: FindingKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            context: None,
            suggestion: None,
            link_url: None,
            link_status: None,
            rule_id: None,
            category: None,
            offset: None,
            page_url: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_link(mut self, url: impl Into<String>, status: Option<u16>) -> Self {
        self.link_url = Some(url.into());
        self.link_status = status;
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn on_page(mut self, page_url: &Url) -> Self {
        self.page_url = Some(page_url.clone());
        self
    }
}
