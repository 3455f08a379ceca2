//! Entries and codes.
//!
//! A code is the lookup key a user types: 1..=6 lowercase letters, digits or
//! semicolons. Several entries MAY share a code (intentional "duplicate
//! code"); the exact (word, code) pair is unique across the codebook. Weight
//! orders entries sharing a code: lower sorts first.

use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum code length in characters.
pub const MAX_CODE_LEN: usize = 6;

const fn is_code_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == ';'
}

// ============================================================================
// Code
// ============================================================================

/// A validated input-method code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    pub fn new(code: impl Into<String>) -> Result<Self, ModelError> {
        let code = code.into();
        if code.is_empty() {
            return Err(ModelError::EmptyCode);
        }
        let len = code.chars().count();
        if len > MAX_CODE_LEN {
            return Err(ModelError::CodeTooLong { code, len });
        }
        if let Some(ch) = code.chars().find(|c| !is_code_char(*c)) {
            return Err(ModelError::InvalidCodeChar { code, ch });
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The code extended with `suffix`, or `None` when the result would not
    /// be a valid code (too long, bad character).
    pub fn with_suffix(&self, suffix: &str) -> Option<Self> {
        Self::new(format!("{}{}", self.0, suffix)).ok()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Code {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Code {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

// ============================================================================
// Entry type & status
// ============================================================================

/// Entry category. The base weight anchors dynamic weight resolution: a new
/// entry on a (code, type) starts at `base_weight + occupant count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Single,
    Phrase,
    Sentence,
    Symbol,
    Link,
    Poem,
    Other,
}

impl EntryType {
    pub const fn base_weight(self) -> i64 {
        match self {
            Self::Single => 10,
            Self::Phrase => 100,
            Self::Sentence => 1000,
            Self::Symbol => 10,
            Self::Link | Self::Poem | Self::Other => 10000,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Phrase => "phrase",
            Self::Sentence => "sentence",
            Self::Symbol => "symbol",
            Self::Link => "link",
            Self::Poem => "poem",
            Self::Other => "other",
        }
    }

    /// Display label used by the CLI and impact texts.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "单字",
            Self::Phrase => "词组",
            Self::Sentence => "整句",
            Self::Symbol => "符号",
            Self::Link => "网址",
            Self::Poem => "诗词",
            Self::Other => "其他",
        }
    }

    pub const ALL: [Self; 7] = [
        Self::Single,
        Self::Phrase,
        Self::Sentence,
        Self::Symbol,
        Self::Link,
        Self::Poem,
        Self::Other,
    ];
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ModelError::UnknownEntryType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Active,
    Deprecated,
}

// ============================================================================
// Entry
// ============================================================================

/// One persisted codebook row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub word: String,
    pub code: Code,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub weight: i64,
    #[serde(default)]
    pub status: EntryStatus,
}

impl Entry {
    pub fn new(word: impl Into<String>, code: Code, entry_type: EntryType, weight: i64) -> Self {
        Self {
            word: word.into(),
            code,
            entry_type,
            weight,
            status: EntryStatus::Active,
        }
    }

    /// Exact-pair identity: (word, code) is the codebook's unique key.
    pub fn pair_matches(&self, word: &str, code: &Code) -> bool {
        self.word == word && &self.code == code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_accepts_letters_digits_semicolons() {
        assert!(Code::new("rjgl").is_ok());
        assert!(Code::new("a1;").is_ok());
        assert!(Code::new(";;").is_ok());
    }

    #[test]
    fn code_rejects_empty_long_and_bad_chars() {
        assert_eq!(Code::new(""), Err(ModelError::EmptyCode));
        assert!(matches!(
            Code::new("abcdefg"),
            Err(ModelError::CodeTooLong { len: 7, .. })
        ));
        assert!(matches!(
            Code::new("Abc"),
            Err(ModelError::InvalidCodeChar { ch: 'A', .. })
        ));
        assert!(matches!(
            Code::new("a b"),
            Err(ModelError::InvalidCodeChar { ch: ' ', .. })
        ));
    }

    #[test]
    fn code_suffix_respects_max_len() {
        let code = Code::new("abcde").unwrap();
        assert_eq!(code.with_suffix("a").unwrap().as_str(), "abcdea");
        assert!(code.with_suffix(";;").is_none());
    }

    #[test]
    fn base_weights() {
        assert_eq!(EntryType::Single.base_weight(), 10);
        assert_eq!(EntryType::Phrase.base_weight(), 100);
        assert_eq!(EntryType::Sentence.base_weight(), 1000);
        assert_eq!(EntryType::Symbol.base_weight(), 10);
        assert_eq!(EntryType::Link.base_weight(), 10000);
    }

    #[test]
    fn entry_serde_uses_type_field() {
        let entry = Entry::new("如果", Code::new("rjgl").unwrap(), EntryType::Phrase, 100);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "phrase");
        assert_eq!(json["code"], "rjgl");
        let back: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn entry_status_defaults_to_active() {
        let entry: Entry = serde_json::from_str(
            r#"{"word":"如果","code":"rjgl","type":"phrase","weight":100}"#,
        )
        .unwrap();
        assert_eq!(entry.status, EntryStatus::Active);
    }
}
