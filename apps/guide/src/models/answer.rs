use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::grounding::{CanonicalRefusal, RefusalReason};
use crate::reference::City;
use crate::scope::{Rejection, Topic};

/// Where an answer's text came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSource {
    /// Turned away before retrieval.
    ScopeGate,
    /// Generated from the city's reference, with the passages that were in
    /// the prompt (empty when only the full document was used).
    Reference { city: City, passage_ids: Vec<String> },
    /// The pipeline could not produce a grounded answer.
    System,
}

/// The single response to one `Query`.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub is_refusal: bool,
    pub reason: Option<RefusalReason>,
    pub source: AnswerSource,
    pub grounding_passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested_topics: Vec<Topic>,
    /// Operator detail (guard verdict, generator error). Kept out of the
    /// serialized form; handlers add it back only when diagnostics are enabled.
    #[serde(skip)]
    pub diagnostic: Option<String>,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    /// Accepted, non-refusal model output.
    pub fn grounded(text: String, city: City, passage_ids: Vec<String>) -> Self {
        Self {
            text,
            is_refusal: false,
            reason: None,
            source: AnswerSource::Reference { city, passage_ids },
            grounding_passed: true,
            suggested_topics: Vec::new(),
            diagnostic: None,
            answered_at: Utc::now(),
        }
    }

    /// A canonical refusal. `grounding_passed` is true only when the guard
    /// reviewed and accepted the text.
    pub fn refusal(
        refusal: CanonicalRefusal,
        reason: RefusalReason,
        source: AnswerSource,
        grounding_passed: bool,
        diagnostic: Option<String>,
    ) -> Self {
        Self {
            text: refusal.text().to_string(),
            is_refusal: true,
            reason: Some(reason),
            source,
            grounding_passed,
            suggested_topics: Vec::new(),
            diagnostic,
            answered_at: Utc::now(),
        }
    }

    /// The sentence mapped from `reason`, from the system itself.
    pub fn system_refusal(reason: RefusalReason, diagnostic: impl Into<String>) -> Self {
        Self::refusal(
            reason.refusal(),
            reason,
            AnswerSource::System,
            false,
            Some(diagnostic.into()),
        )
    }

    /// Scope-gate rejection: readable message plus topic suggestions.
    pub fn rejected(rejection: Rejection, suggested_topics: Vec<Topic>) -> Self {
        Self {
            text: rejection.message(),
            is_refusal: true,
            reason: Some(RefusalReason::OutOfScope),
            source: AnswerSource::ScopeGate,
            grounding_passed: false,
            suggested_topics,
            diagnostic: Some(format!("scope gate: {}", rejection.label())),
            answered_at: Utc::now(),
        }
    }
}
