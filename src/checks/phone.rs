//! Ukrainian phone number checker
//!
//! Validates every `tel:` link on a page and flags phone-shaped text that no
//! `tel:` link covers.

use crate::checks::{context_window, CheckResult, PageCheck};
use crate::crawler::anchors;
use crate::model::{FetchedPage, Finding, FindingKind, Preferences, Severity};
use async_trait::async_trait;
use regex::Regex;

const CANONICAL_SHAPE: &str = "+380XXXXXXXXX";
const INVALID_MESSAGE: &str = "Неправильний формат українського номеру телефону";
const CONTEXT_RADIUS: usize = 50;

/// Phone-shaped substrings searched in page text
const TEXT_PATTERNS: &[&str] = &[
    r"\+?[0-9]{3}[\s\-]?[0-9]{2}[\s\-]?[0-9]{3}[\s\-]?[0-9]{2}[\s\-]?[0-9]{2}",
    r"\+?[0-9]{3}[\s\-]?[0-9]{9}",
    r"0[0-9]{2}[\s\-]?[0-9]{3}[\s\-]?[0-9]{2}[\s\-]?[0-9]{2}",
];

/// Accepted number shapes, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneShape {
    /// `+380` followed by nine digits
    International,
    /// `380` followed by nine digits
    MissingPlus,
    /// `0` followed by nine digits
    National,
}

/// Result of validating one phone candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneValidation {
    /// Candidate with spaces, dashes and parentheses removed
    pub cleaned: String,
    pub shape: Option<PhoneShape>,
}

impl PhoneValidation {
    pub fn is_valid(&self) -> bool {
        self.shape.is_some()
    }

    /// Description of the detected format
    pub fn format_message(&self) -> &'static str {
        match self.shape {
            Some(PhoneShape::International) => "Правильний формат: +380XXXXXXXXX",
            Some(PhoneShape::MissingPlus) => "Правильний формат, але краще з +: +380XXXXXXXXX",
            Some(PhoneShape::National) => "Локальний формат, додайте код країни: +380XXXXXXXXX",
            None => INVALID_MESSAGE,
        }
    }

    /// Advice for valid numbers not written in the international shape
    pub fn recommendation(&self) -> Option<&'static str> {
        match self.shape {
            Some(PhoneShape::MissingPlus) | Some(PhoneShape::National) => {
                Some(self.format_message())
            }
            _ => None,
        }
    }

    /// The number in `+380XXXXXXXXX` form, for valid numbers
    pub fn canonical(&self) -> Option<String> {
        let digits: String = self.cleaned.chars().filter(char::is_ascii_digit).collect();
        match self.shape? {
            PhoneShape::International | PhoneShape::MissingPlus => Some(format!("+{}", digits)),
            PhoneShape::National => Some(format!("+38{}", digits)),
        }
    }
}

/// Validates phone candidates against the three accepted Ukrainian shapes
#[derive(Debug)]
pub struct PhoneValidator {
    shapes: Vec<(Regex, PhoneShape)>,
    strip: Regex,
}

impl PhoneValidator {
    pub fn new() -> CheckResult<Self> {
        Ok(Self {
            shapes: vec![
                (Regex::new(r"^\+380[0-9]{9}$")?, PhoneShape::International),
                (Regex::new(r"^380[0-9]{9}$")?, PhoneShape::MissingPlus),
                (Regex::new(r"^0[0-9]{9}$")?, PhoneShape::National),
            ],
            strip: Regex::new(r"[\s\-()]")?,
        })
    }

    /// Validates one candidate
    ///
    /// # Examples
    ///
    /// ```
    /// use site_audit::checks::PhoneValidator;
    ///
    /// let validator = PhoneValidator::new().unwrap();
    /// assert!(validator.validate("+380 50 123-45-67").is_valid());
    /// assert!(!validator.validate("12345").is_valid());
    /// ```
    pub fn validate(&self, candidate: &str) -> PhoneValidation {
        let cleaned = self.strip.replace_all(candidate.trim(), "").into_owned();
        let shape = self
            .shapes
            .iter()
            .find(|(pattern, _)| pattern.is_match(&cleaned))
            .map(|(_, shape)| *shape);

        PhoneValidation { cleaned, shape }
    }
}

/// Digits of a number in national `380XXXXXXXXX` form when recognizable
///
/// Used to decide whether a phone in text is covered by a `tel:` link: two
/// strings denote the same number exactly when these digit strings are equal.
pub fn comparable_digits(s: &str) -> String {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 && digits.starts_with('0') {
        format!("38{}", digits)
    } else {
        digits
    }
}

/// Phone checker over page markup and text
#[derive(Debug)]
pub struct PhoneCheck {
    validator: PhoneValidator,
    text_patterns: Vec<Regex>,
}

impl PhoneCheck {
    pub fn new() -> CheckResult<Self> {
        let text_patterns = TEXT_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            validator: PhoneValidator::new()?,
            text_patterns,
        })
    }

    fn check_tel_link(&self, number: &str, link_text: &str) -> Option<Finding> {
        let validation = self.validator.validate(number);
        let context = if link_text.is_empty() { number } else { link_text };

        if !validation.is_valid() {
            return Some(
                Finding::new(FindingKind::Phone, Severity::Warning, INVALID_MESSAGE)
                    .with_context(context)
                    .with_suggestion(CANONICAL_SHAPE)
                    .with_rule("phone_invalid_format"),
            );
        }

        let recommendation = validation.recommendation()?;
        let rule = match validation.shape {
            Some(PhoneShape::MissingPlus) => "phone_missing_plus",
            _ => "phone_missing_country_code",
        };
        let finding = Finding::new(FindingKind::Phone, Severity::Info, recommendation)
            .with_context(context)
            .with_rule(rule);

        Some(match validation.canonical() {
            Some(canonical) => finding.with_suggestion(canonical),
            None => finding,
        })
    }

    /// Phone-shaped spans of text, overlapping matches reduced to the longest
    ///
    /// Matches that sit inside a longer digit run (order numbers, IBANs) are dropped.
    fn phone_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = self
            .text_patterns
            .iter()
            .flat_map(|p| p.find_iter(text).map(|m| (m.start(), m.end())))
            .filter(|&(start, end)| stands_alone(text, start, end))
            .collect();

        spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));
        let mut kept: Vec<(usize, usize)> = Vec::new();
        for (start, end) in spans {
            if kept.iter().all(|(ks, ke)| end <= *ks || start >= *ke) {
                kept.push((start, end));
            }
        }
        kept.sort();
        kept
    }
}

/// True when no digit touches the span on either side
fn stands_alone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

#[async_trait]
impl PageCheck for PhoneCheck {
    fn name(&self) -> &'static str {
        "phones"
    }

    fn kind(&self) -> FindingKind {
        FindingKind::Phone
    }

    fn applicable(&self, page: &FetchedPage, prefs: &Preferences) -> bool {
        prefs.phones && !page.html.trim().is_empty()
    }

    async fn run(&self, page: &FetchedPage) -> CheckResult<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut covered: Vec<String> = Vec::new();

        for anchor in anchors(&page.html) {
            let Some(number) = anchor
                .href
                .get(..4)
                .filter(|scheme| scheme.eq_ignore_ascii_case("tel:"))
                .map(|_| anchor.href[4..].trim())
            else {
                continue;
            };

            covered.push(comparable_digits(number));
            if !anchor.text.is_empty() {
                covered.push(comparable_digits(&anchor.text));
            }

            findings.extend(self.check_tel_link(number, &anchor.text));
        }

        for (start, end) in self.phone_spans(&page.text) {
            let phone = &page.text[start..end];
            let digits = comparable_digits(phone);
            if covered.iter().any(|c| *c == digits) {
                continue;
            }

            findings.push(
                Finding::new(
                    FindingKind::Phone,
                    Severity::Info,
                    format!("Номер телефону не є клікабельним: {}", phone),
                )
                .with_context(context_window(&page.text, start, end, CONTEXT_RADIUS))
                .with_suggestion(format!(
                    "Зробіть посилання: <a href=\"tel:{}\">{}</a>",
                    phone, phone
                ))
                .with_rule("phone_not_clickable"),
            );
        }

        Ok(findings)
    }
}
