//! Grammar oracle adapter
//!
//! Spelling and grammar are delegated to an external oracle (a LanguageTool
//! server). The adapter collapses whitespace, splits long text into chunks,
//! filters whitelisted words and maps oracle matches to findings. When the
//! oracle cannot be reached at startup the adapter is disabled and every
//! check yields nothing.

use crate::checks::{context_window, CheckResult, OracleError, PageCheck};
use crate::config::GrammarConfig;
use crate::model::{FetchedPage, Finding, FindingKind, Preferences, Severity};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters of context kept on each side of a match
const CONTEXT_RADIUS: usize = 50;

/// Shorter texts are not sent to the oracle
const MIN_TEXT_CHARS: usize = 3;

const MAX_SUGGESTIONS: usize = 3;

/// One issue reported by the oracle for a chunk
///
/// `offset` and `length` count characters from the start of the chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleMatch {
    pub offset: usize,
    pub length: usize,
    pub message: String,
    pub replacements: Vec<String>,
    pub rule_id: Option<String>,
    pub category: Option<String>,
}

/// External spelling/grammar engine
#[async_trait]
pub trait GrammarOracle: Send + Sync {
    /// Checks that the oracle is reachable
    async fn probe(&self) -> Result<(), OracleError>;

    async fn check(&self, chunk: &str) -> Result<Vec<OracleMatch>, OracleError>;
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<RawReplacement>,
    rule: Option<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawReplacement {
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    category: Option<RawCategory>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    id: Option<String>,
}

impl From<RawMatch> for OracleMatch {
    fn from(raw: RawMatch) -> Self {
        let (rule_id, category) = match raw.rule {
            Some(rule) => (Some(rule.id), rule.category.and_then(|c| c.id)),
            None => (None, None),
        };
        Self {
            offset: raw.offset,
            length: raw.length,
            message: raw.message,
            replacements: raw.replacements.into_iter().map(|r| r.value).collect(),
            rule_id,
            category,
        }
    }
}

/// LanguageTool HTTP API client (`/v2/check`, `/v2/languages`)
#[derive(Debug, Clone)]
pub struct LanguageToolOracle {
    client: Client,
    endpoint: String,
    language: String,
}

impl LanguageToolOracle {
    pub fn new(client: Client, endpoint: &str, language: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl GrammarOracle for LanguageToolOracle {
    async fn probe(&self) -> Result<(), OracleError> {
        let response = self
            .client
            .get(format!("{}/v2/languages", self.endpoint))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn check(&self, chunk: &str) -> Result<Vec<OracleMatch>, OracleError> {
        let response = self
            .client
            .post(format!("{}/v2/check", self.endpoint))
            .form(&[("text", chunk), ("language", self.language.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }

        let body: CheckResponse = response.json().await?;
        Ok(body.matches.into_iter().map(OracleMatch::from).collect())
    }
}

/// Turns page text into spelling findings through an optional oracle
pub struct GrammarAdapter {
    oracle: Option<Arc<dyn GrammarOracle>>,
    chunk_size: usize,
}

impl GrammarAdapter {
    /// An adapter that never reports anything
    pub fn disabled() -> Self {
        Self {
            oracle: None,
            chunk_size: 1,
        }
    }

    /// Probes the oracle once; an unreachable oracle disables the adapter
    pub async fn connect(oracle: Arc<dyn GrammarOracle>, chunk_size: usize) -> Self {
        match oracle.probe().await {
            Ok(()) => {
                info!("Grammar oracle available");
                Self {
                    oracle: Some(oracle),
                    chunk_size: chunk_size.max(1),
                }
            }
            Err(e) => {
                warn!("Grammar oracle unavailable, spelling checks disabled: {}", e);
                Self::disabled()
            }
        }
    }

    /// Builds the adapter described by the `[grammar]` config section
    pub async fn from_config(client: Client, config: &GrammarConfig) -> Self {
        if !config.enabled {
            info!("Grammar checks disabled by configuration");
            return Self::disabled();
        }
        let oracle = LanguageToolOracle::new(client, &config.endpoint, &config.language);
        Self::connect(Arc::new(oracle), config.chunk_size).await
    }

    pub fn is_enabled(&self) -> bool {
        self.oracle.is_some()
    }

    /// Checks text and maps oracle matches to spelling findings
    ///
    /// Chunks are checked in order. A chunk the oracle fails on is logged and
    /// skipped; later chunks keep their absolute offsets.
    pub async fn check(&self, text: &str, whitelist: &[String]) -> Vec<Finding> {
        let Some(oracle) = &self.oracle else {
            return Vec::new();
        };

        let text = collapse_whitespace(text);
        if text.chars().count() < MIN_TEXT_CHARS {
            return Vec::new();
        }

        let whitelist: Vec<String> = whitelist.iter().map(|w| w.to_lowercase()).collect();
        let mut findings = Vec::new();
        let mut chunk_offset = 0;

        for chunk in split_chunks(&text, self.chunk_size) {
            match oracle.check(chunk).await {
                Ok(matches) => {
                    for m in matches {
                        if let Some(finding) = map_match(chunk, chunk_offset, &m, &whitelist) {
                            findings.push(finding);
                        }
                    }
                }
                Err(e) => warn!("Grammar check failed for chunk at {}: {}", chunk_offset, e),
            }
            chunk_offset += chunk.chars().count();
        }

        findings
    }
}

fn map_match(chunk: &str, chunk_offset: usize, m: &OracleMatch, whitelist: &[String]) -> Option<Finding> {
    let start = char_to_byte(chunk, m.offset);
    let end = char_to_byte(chunk, m.offset + m.length);
    let word = &chunk[start..end];

    if whitelist.contains(&word.to_lowercase()) {
        return None;
    }

    let mut finding = Finding::new(FindingKind::Spelling, Severity::Warning, m.message.clone())
        .with_context(context_window(chunk, start, end, CONTEXT_RADIUS))
        .with_offset(chunk_offset + m.offset);

    if !m.replacements.is_empty() {
        let suggestion = m
            .replacements
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        finding = finding.with_suggestion(suggestion);
    }
    if let Some(rule_id) = &m.rule_id {
        finding = finding.with_rule(rule_id.clone());
    }
    if let Some(category) = &m.category {
        finding = finding.with_category(category.clone());
    }

    Some(finding)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte index of the `index`-th character, clamped to the end of `s`
fn char_to_byte(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map(|(i, _)| i).unwrap_or(s.len())
}

/// Splits text into pieces of at most `size` characters
fn split_chunks(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = char_to_byte(rest, size);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Spelling checker over page text
pub struct GrammarCheck {
    adapter: Arc<GrammarAdapter>,
    whitelist: Vec<String>,
}

impl GrammarCheck {
    pub fn new(adapter: Arc<GrammarAdapter>, whitelist: Vec<String>) -> Self {
        Self { adapter, whitelist }
    }
}

#[async_trait]
impl PageCheck for GrammarCheck {
    fn name(&self) -> &'static str {
        "spelling"
    }

    fn kind(&self) -> FindingKind {
        FindingKind::Spelling
    }

    fn applicable(&self, page: &FetchedPage, prefs: &Preferences) -> bool {
        prefs.spelling && !page.text.trim().is_empty()
    }

    async fn run(&self, page: &FetchedPage) -> CheckResult<Vec<Finding>> {
        Ok(self.adapter.check(&page.text, &self.whitelist).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Flags every occurrence of the given words; fails on chunks containing "FAIL"
    struct WordOracle {
        words: Vec<&'static str>,
        chunks: Mutex<Vec<String>>,
    }

    impl WordOracle {
        fn new(words: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                words,
                chunks: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GrammarOracle for WordOracle {
        async fn probe(&self) -> Result<(), OracleError> {
            Ok(())
        }

        async fn check(&self, chunk: &str) -> Result<Vec<OracleMatch>, OracleError> {
            self.chunks.lock().unwrap().push(chunk.to_string());
            if chunk.contains("FAIL") {
                return Err(OracleError::Unavailable("scripted failure".into()));
            }
            let mut matches = Vec::new();
            for word in &self.words {
                for (byte, _) in chunk.match_indices(word) {
                    matches.push(OracleMatch {
                        offset: chunk[..byte].chars().count(),
                        length: word.chars().count(),
                        message: format!("Можлива орфографічна помилка: {}", word),
                        replacements: vec!["а".into(), "б".into(), "в".into(), "г".into()],
                        rule_id: Some("MORFOLOGIK_RULE_UK_UA".into()),
                        category: Some("TYPOS".into()),
                    });
                }
            }
            Ok(matches)
        }
    }

    struct DownOracle;

    #[async_trait]
    impl GrammarOracle for DownOracle {
        async fn probe(&self) -> Result<(), OracleError> {
            Err(OracleError::Unavailable("connection refused".into()))
        }

        async fn check(&self, _chunk: &str) -> Result<Vec<OracleMatch>, OracleError> {
            panic!("disabled adapter must not call the oracle");
        }
    }

    #[tokio::test]
    async fn test_maps_matches_to_findings() {
        let oracle = WordOracle::new(vec!["помилкка"]);
        let adapter = GrammarAdapter::connect(oracle, 20000).await;

        let findings = adapter.check("Тут  є\n\nпомилкка у тексті", &[]).await;
        assert_eq!(findings.len(), 1);

        let finding = &findings[0];
        assert_eq!(finding.kind, FindingKind::Spelling);
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.offset, Some(6));
        assert_eq!(finding.suggestion.as_deref(), Some("а, б, в"));
        assert_eq!(finding.rule_id.as_deref(), Some("MORFOLOGIK_RULE_UK_UA"));
        assert_eq!(finding.category.as_deref(), Some("TYPOS"));
        assert_eq!(finding.context.as_deref(), Some("Тут є помилкка у тексті"));
    }

    #[tokio::test]
    async fn test_whitelist_is_case_insensitive() {
        let oracle = WordOracle::new(vec!["Сумі"]);
        let adapter = GrammarAdapter::connect(oracle, 20000).await;

        let findings = adapter.check("Компанія Сумі працює", &["сУМІ".to_string()]).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_chunk_offsets_are_absolute() {
        let oracle = WordOracle::new(vec!["ї"]);
        let adapter = GrammarAdapter::connect(oracle.clone(), 10).await;

        // 25 chars: chunks of 10, 10, 5 with "ї" at 3, 14 and 22
        let text = "абвїдежзийклмнїпрстуфхцїш";
        assert_eq!(text.chars().count(), 25);
        let findings = adapter.check(text, &[]).await;

        let offsets: Vec<usize> = findings.iter().filter_map(|f| f.offset).collect();
        assert_eq!(offsets, vec![3, 14, 23]);
        assert_eq!(oracle.chunks.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped() {
        let oracle = WordOracle::new(vec!["ґ"]);
        let adapter = GrammarAdapter::connect(oracle, 5).await;

        // second chunk fails; the third still reports its absolute offset
        let findings = adapter.check("ґабвгFAILxґабв", &[]).await;
        let offsets: Vec<usize> = findings.iter().filter_map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 10]);
    }

    #[tokio::test]
    async fn test_unreachable_oracle_disables_adapter() {
        let adapter = GrammarAdapter::connect(Arc::new(DownOracle), 20000).await;
        assert!(!adapter.is_enabled());
        assert!(adapter.check("Будь-який текст", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_short_text_is_not_checked() {
        let oracle = WordOracle::new(vec!["аб"]);
        let adapter = GrammarAdapter::connect(oracle.clone(), 20000).await;
        assert!(adapter.check("  аб  ", &[]).await.is_empty());
        assert!(oracle.chunks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_languagetool_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/languages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/check"))
            .and(body_string_contains("language=uk-UA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [{
                    "message": "Можлива орфографічна помилка",
                    "offset": 4,
                    "length": 5,
                    "replacements": [{"value": "слово"}],
                    "rule": {"id": "MORFOLOGIK_RULE_UK_UA", "category": {"id": "TYPOS", "name": "Орфографія"}}
                }]
            })))
            .mount(&server)
            .await;

        let config = GrammarConfig {
            enabled: true,
            endpoint: server.uri(),
            language: "uk-UA".to_string(),
            chunk_size: 20000,
        };
        let adapter = GrammarAdapter::from_config(Client::new(), &config).await;
        assert!(adapter.is_enabled());

        let findings = adapter.check("Тут слвоо є", &[]).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].suggestion.as_deref(), Some("слово"));
        assert_eq!(findings[0].category.as_deref(), Some("TYPOS"));
        assert_eq!(findings[0].offset, Some(4));
    }

    #[tokio::test]
    async fn test_disabled_by_config() {
        let config = GrammarConfig {
            enabled: false,
            ..GrammarConfig::default()
        };
        let adapter = GrammarAdapter::from_config(Client::new(), &config).await;
        assert!(!adapter.is_enabled());
    }

    #[test]
    fn test_split_chunks_multibyte() {
        assert_eq!(split_chunks("абвгд", 2), vec!["аб", "вг", "д"]);
        assert!(split_chunks("", 2).is_empty());
    }
}
