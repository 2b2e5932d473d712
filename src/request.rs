//! Translation request validation
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. the text is not blank ([`RequestError::EmptyInput`])
//! 2. both language codes are supported ([`RequestError::UnsupportedLanguage`])
//! 3. the languages differ ([`RequestError::IdenticalLanguage`])
//!
//! A blank request with an unsupported language therefore reports the blank
//! text.

use crate::error::RequestError;
use crate::languages::{self, LanguageId, LanguagePair};
use serde::{Deserialize, Serialize};

/// An inbound translation call, as received from a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// A request that passed validation, with languages resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// The original text, untrimmed
    pub text: String,
    pub pair: LanguagePair,
}

impl ValidatedRequest {
    pub fn source_tag(&self) -> &'static str {
        self.pair.source().tag()
    }

    pub fn target_tag(&self) -> &'static str {
        self.pair.target().tag()
    }
}

/// Validate a request, short-circuiting on the first failed check
pub fn validate(request: &TranslationRequest) -> Result<ValidatedRequest, RequestError> {
    if request.text.trim().is_empty() {
        return Err(RequestError::EmptyInput);
    }

    let source = LanguageId::from_code(&request.source_lang);
    let target = LanguageId::from_code(&request.target_lang);
    let (source, target) = match (source, target) {
        (Some(source), Some(target)) => (source, target),
        _ => {
            let codes = [
                (source, &request.source_lang),
                (target, &request.target_lang),
            ]
            .into_iter()
            .filter(|(resolved, _)| resolved.is_none())
            .map(|(_, code)| code.clone())
            .collect();
            return Err(RequestError::UnsupportedLanguage {
                codes,
                supported: languages::supported_codes(),
            });
        }
    };

    let pair = LanguagePair::new(source, target).ok_or(RequestError::IdenticalLanguage)?;

    Ok(ValidatedRequest {
        text: request.text.clone(),
        pair,
    })
}
