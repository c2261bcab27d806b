use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

const PHONE_SEPARATORS: &[char] = &[' ', '+', '-', '(', ')', '.'];
const MIN_PHONE_DIGITS: usize = 6;

/// Interface language the visitor had selected when submitting the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    /// Accepts tags like `en`, `EN`, `en-US`; anything unrecognised falls back to Russian.
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag.map(str::trim).filter(|tag| !tag.is_empty()) else {
            return Self::default();
        };
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Self::En,
            _ => Self::Ru,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Email,
    Phone,
    Other,
}

impl ContactKind {
    /// Classification only picks a label; unusual contacts are still relayed.
    pub fn classify(contact: &str) -> Self {
        let contact = contact.trim();
        if EMAIL_RE.is_match(contact) {
            return Self::Email;
        }

        let digits: String = contact
            .chars()
            .filter(|c| !PHONE_SEPARATORS.contains(c))
            .collect();
        if digits.len() >= MIN_PHONE_DIGITS && digits.chars().all(|c| c.is_ascii_digit()) {
            return Self::Phone;
        }

        Self::Other
    }
}

/// A contact-form submission as received. Fields are not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub contact: String,
    pub service: Option<String>,
    pub message: Option<String>,
    pub language: Language,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
