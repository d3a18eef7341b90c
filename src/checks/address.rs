//! Ukrainian postal address checker
//!
//! A liberal detection set finds address-shaped substrings; a strict canonical
//! set (`м. Місто, вул. Назва, 12[, кв. 3]` and the `пров.`, `проспект`,
//! `бульвар` variants) decides which of them are correctly written.

use crate::checks::{context_window, CheckResult, PageCheck};
use crate::model::{FetchedPage, Finding, FindingKind, Preferences, Severity};
use async_trait::async_trait;
use regex::Regex;

const CITY: &str = r"[А-ЯІЇЄҐ][а-яіїєґ'\-]+";
/// Street name: a capitalised word, optionally followed by more words ("Велика Васильківська")
const NAME: &str = r"[А-ЯІЇЄҐ][а-яіїєґ'\-]+(?:\s+[А-ЯІЇЄҐа-яіїєґ][а-яіїєґ'\-]*)*";

/// Characters of context kept on each side of a reported address
const CONTEXT_RADIUS: usize = 100;

const FORMAT_HINT: &str = "Використовуйте формат: м. Місто, вул. Назва, 123";

fn canonical_patterns() -> Vec<String> {
    let street = |kind: &str| format!(r"м\.\s+{CITY},\s+{kind}\s+{NAME},\s+\d+");
    vec![
        street(r"вул\."),
        street(r"пров\."),
        street("проспект"),
        street("бульвар"),
        format!(r"м\.\s+{CITY},\s+вул\.\s+{NAME},\s+\d+,\s+кв\.\s+\d+"),
    ]
}

fn detection_patterns() -> Vec<String> {
    vec![
        format!(r"\b[мМ]\.?\s*{CITY}[\s,]+(?:вул|пров|проспект|бульвар)\.?\s*{NAME}[\s,]+\d+"),
        format!(r"\b(?:місто|м)[\s\.]*{CITY}"),
        format!(r"\b(?:вулиця|вул)[\s\.]*{NAME}[\s,]+\d+"),
    ]
}

/// A structural rule an address may break, with the message naming it
struct IssueRule {
    pattern: Regex,
    message: &'static str,
}

/// Detects and validates Ukrainian postal addresses in free text
#[derive(Debug)]
pub struct AddressMatcher {
    /// Canonical patterns anchored for full-string matching
    canonical_full: Vec<Regex>,
    /// Canonical patterns for locating correct addresses inside text
    canonical_search: Vec<Regex>,
    detection: Vec<Regex>,
    issues: Vec<IssueRule>,
    rewrites: Vec<(Regex, &'static str)>,
}

impl std::fmt::Debug for IssueRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueRule")
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl AddressMatcher {
    /// Compiles every pattern
    ///
    /// # Returns
    ///
    /// * `Ok(AddressMatcher)` - All patterns compiled
    /// * `Err(CheckError::Pattern)` - A pattern failed to compile
    pub fn new() -> CheckResult<Self> {
        let canonical = canonical_patterns();

        let canonical_full = canonical
            .iter()
            .map(|p| Regex::new(&format!("^(?:{})$", p)))
            .collect::<Result<Vec<_>, _>>()?;
        let canonical_search = canonical
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let detection = detection_patterns()
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let issues = vec![
            IssueRule {
                pattern: Regex::new(r"(?:^|[^м])(?:місто|М[А-ЯІЇЄҐ])")?,
                message: "Відсутнє скорочення \"м.\" перед назвою міста",
            },
            IssueRule {
                pattern: Regex::new(r"(?:вулиця|провулок)\s+[А-ЯІЇЄҐ]")?,
                message: "Використовуйте скорочення \"вул.\" або \"пров.\" замість повної назви",
            },
            IssueRule {
                pattern: Regex::new(r"^[^,]*$")?,
                message: "Відсутні коми між частинами адреси",
            },
            IssueRule {
                pattern: Regex::new(r"[мвп]\.[А-ЯІЇЄҐ]")?,
                message: "Відсутній пробіл після скорочення",
            },
        ];

        let rewrites = vec![
            (Regex::new(&format!(r"^({CITY})[\s,]+"))?, "м. ${1}, "),
            (Regex::new(r"(?i)місто\s+")?, "м. "),
            (Regex::new(r"(?i)вулиця\s+")?, "вул. "),
            (Regex::new(r"(?i)провулок\s+")?, "пров. "),
            (Regex::new(r"([мвп])\.([А-ЯІЇЄҐ])")?, "${1}. ${2}"),
            (Regex::new(r"([а-яіїєґ])\s+(вул|пров)")?, "${1}, ${2}"),
            (Regex::new(r"([а-яіїєґ\.])\s+(\d)")?, "${1}, ${2}"),
        ];

        Ok(Self {
            canonical_full,
            canonical_search,
            detection,
            issues,
            rewrites,
        })
    }

    /// Returns true if the whole (trimmed) string is a canonical address
    pub fn is_correct(&self, address: &str) -> bool {
        let address = address.trim();
        self.canonical_full.iter().any(|p| p.is_match(address))
    }

    /// Finds malformed addresses in text
    ///
    /// Overlapping detections are reported once (the longest wins), and
    /// detections lying inside a correctly written address are skipped.
    pub fn validate_text(&self, text: &str) -> Vec<Finding> {
        let correct_spans: Vec<(usize, usize)> = self
            .canonical_search
            .iter()
            .flat_map(|p| p.find_iter(text).map(|m| (m.start(), m.end())))
            .collect();

        let mut candidates: Vec<(usize, usize)> = self
            .detection
            .iter()
            .flat_map(|p| p.find_iter(text).map(|m| (m.start(), m.end())))
            .filter(|(start, end)| {
                !correct_spans
                    .iter()
                    .any(|(cs, ce)| cs <= start && end <= ce)
            })
            .collect();

        // longest first, then by position, so a kept span swallows what it overlaps
        candidates.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));
        let mut kept: Vec<(usize, usize)> = Vec::new();
        for (start, end) in candidates {
            if kept.iter().all(|(ks, ke)| end <= *ks || start >= *ke) {
                kept.push((start, end));
            }
        }
        kept.sort();

        kept.into_iter()
            .filter_map(|(start, end)| {
                let address = &text[start..end];
                if self.is_correct(address) {
                    return None;
                }
                Some(self.finding_for(address, context_window(text, start, end, CONTEXT_RADIUS)))
            })
            .collect()
    }

    fn finding_for(&self, address: &str, context: String) -> Finding {
        let issues: Vec<&str> = self
            .issues
            .iter()
            .filter(|rule| rule.pattern.is_match(address))
            .map(|rule| rule.message)
            .collect();

        let detail = if issues.is_empty() {
            FORMAT_HINT.to_string()
        } else {
            issues.join(" ")
        };

        let finding = Finding::new(
            FindingKind::Address,
            Severity::Error,
            format!("Неправильний формат адреси. {}", detail),
        )
        .with_context(context)
        .with_rule("address_format");

        match self.suggest_correction(address) {
            Some(suggestion) => finding.with_suggestion(suggestion),
            None => finding,
        }
    }

    /// Applies the fixed rewrite sequence; `None` when nothing changed
    pub fn suggest_correction(&self, address: &str) -> Option<String> {
        let corrected = self
            .rewrites
            .iter()
            .fold(address.to_string(), |acc, (pattern, replacement)| {
                pattern.replace_all(&acc, *replacement).into_owned()
            });

        (corrected != address).then_some(corrected)
    }
}

/// Address checker over page text
#[derive(Debug)]
pub struct AddressCheck {
    matcher: AddressMatcher,
}

impl AddressCheck {
    pub fn new() -> CheckResult<Self> {
        Ok(Self {
            matcher: AddressMatcher::new()?,
        })
    }
}

#[async_trait]
impl PageCheck for AddressCheck {
    fn name(&self) -> &'static str {
        "addresses"
    }

    fn kind(&self) -> FindingKind {
        FindingKind::Address
    }

    fn applicable(&self, page: &FetchedPage, prefs: &Preferences) -> bool {
        prefs.addresses && !page.text.trim().is_empty()
    }

    async fn run(&self, page: &FetchedPage) -> CheckResult<Vec<Finding>> {
        Ok(self.matcher.validate_text(&page.text))
    }
}
