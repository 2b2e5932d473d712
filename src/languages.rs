//! Language registry
//!
//! Maps the short codes clients send (`en`, `te`) to the language tags the
//! translation model uses internally (`eng_Latn`, `tel_Telu`). Lookups are
//! case-insensitive and never fail loudly: an unknown code simply resolves to
//! `None` and the caller decides how to report it.
//!
//! # Example
//!
//! ```
//! use entel::languages::{LanguageId, resolve};
//!
//! assert_eq!(resolve("TE"), Some("tel_Telu"));
//! assert_eq!(resolve("xx"), None);
//! assert_eq!(LanguageId::from_code("en"), Some(LanguageId::English));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A language the translation model is set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    English,
    Telugu,
}

/// Every supported language, in display order
const LANGUAGES: [LanguageId; 2] = [LanguageId::English, LanguageId::Telugu];

impl LanguageId {
    /// Look up a language by its short code, ignoring case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        LANGUAGES
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    /// Short code used on the wire and as a dataset column header
    pub fn code(self) -> &'static str {
        match self {
            LanguageId::English => "en",
            LanguageId::Telugu => "te",
        }
    }

    /// Model-internal language tag (FLORES-200 style)
    pub fn tag(self) -> &'static str {
        match self {
            LanguageId::English => "eng_Latn",
            LanguageId::Telugu => "tel_Telu",
        }
    }

    /// Human-readable language name for display
    pub fn name(self) -> &'static str {
        match self {
            LanguageId::English => "English",
            LanguageId::Telugu => "Telugu",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Resolve a short code to the model's internal tag
pub fn resolve(code: &str) -> Option<&'static str> {
    LanguageId::from_code(code).map(LanguageId::tag)
}

/// All supported languages
pub fn all() -> &'static [LanguageId] {
    &LANGUAGES
}

/// Human readable list of supported codes, e.g. `'en' and 'te'`
pub fn supported_codes() -> String {
    let quoted: Vec<String> = LANGUAGES
        .iter()
        .map(|lang| format!("'{}'", lang.code()))
        .collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

/// Direction of a translation: source language into target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    source: LanguageId,
    target: LanguageId,
}

impl LanguagePair {
    /// Create a pair; `None` when both sides are the same language
    pub fn new(source: LanguageId, target: LanguageId) -> Option<Self> {
        (source != target).then_some(Self { source, target })
    }

    /// English into Telugu, the direction raw corpora are authored in
    pub fn english_telugu() -> Self {
        Self {
            source: LanguageId::English,
            target: LanguageId::Telugu,
        }
    }

    pub fn source(&self) -> LanguageId {
        self.source
    }

    pub fn target(&self) -> LanguageId {
        self.target
    }

    /// The opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_codes() {
        assert_eq!(resolve("en"), Some("eng_Latn"));
        assert_eq!(resolve("te"), Some("tel_Telu"));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve("EN"), Some("eng_Latn"));
        assert_eq!(resolve("Te"), Some("tel_Telu"));
    }

    #[test]
    fn test_resolve_unknown_code() {
        assert_eq!(resolve("xx"), None);
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("eng_Latn"), None);
    }

    #[test]
    fn test_language_names() {
        assert_eq!(LanguageId::English.name(), "English");
        assert_eq!(LanguageId::from_code("te").map(LanguageId::name), Some("Telugu"));
    }

    #[test]
    fn test_supported_codes_message() {
        assert_eq!(supported_codes(), "'en' and 'te'");
    }

    #[test]
    fn test_pair_rejects_identical_languages() {
        assert!(LanguagePair::new(LanguageId::Telugu, LanguageId::Telugu).is_none());
        let pair = LanguagePair::new(LanguageId::Telugu, LanguageId::English).unwrap();
        assert_eq!(pair.source(), LanguageId::Telugu);
        assert_eq!(pair.target(), LanguageId::English);
    }

    #[test]
    fn test_pair_reversed() {
        let pair = LanguagePair::english_telugu();
        assert_eq!(pair.reversed().source(), LanguageId::Telugu);
        assert_eq!(pair.reversed().reversed(), pair);
        assert_eq!(pair.to_string(), "en → te");
    }
}
