//! GroundingGuard: post-generation check that an answer only restates the
//! active reference document.
//!
//! Rules run in order and the first one that decides wins:
//! 1. an exact canonical refusal is always acceptable;
//! 2. phrasing that leans on outside knowledge is rejected;
//! 3. fewer than 30% of the answer's content words found in the reference is
//!    rejected (an answer with no content words is rejected too);
//! 4. more than 40% of the answer's content words missing from the reference,
//!    or any missing word from the external-source vocabulary, is rejected;
//! 5. everything else is accepted.
//!
//! Rejected answers are replaced by the validation-failed refusal. The guard
//! never tries to edit an answer into shape.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::grounding::refusal::{CanonicalRefusal, RefusalReason};
use crate::text::content_words;

pub const MIN_OVERLAP_RATIO: f64 = 0.3;
pub const MAX_EXTERNAL_RATIO: f64 = 0.4;

const DETAIL_SAMPLE: usize = 10;

/// Citations, opinion, generalisation, world scope, recency.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    r"\b(according to|research shows|studies indicate|experts say)\b",
    r"\b(wikipedia|google|internet|online sources)\b",
    r"\b(i think|i believe|in my opinion|personally)\b",
    r"\b(generally|usually|typically|commonly|often)\b",
    r"\b(worldwide|globally|internationally|across india)\b",
    r"\b(modern|contemporary|recent|latest|current)\b",
];

/// Words that point at a source other than the reference document.
const EXTERNAL_INDICATORS: &[&str] = &[
    "wikipedia",
    "google",
    "internet",
    "website",
    "online",
    "research",
    "study",
    "survey",
    "report",
    "statistics",
    "data",
    "according",
    "experts",
    "scientists",
    "government",
    "official",
    "ministry",
];

static SUSPICIOUS: Lazy<Vec<Regex>> = Lazy::new(|| {
    SUSPICIOUS_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid suspicious pattern"))
        .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GuardRejection {
    SuspiciousPattern { phrase: String },
    NoContentWords,
    InsufficientOverlap { ratio: f64 },
    TooManyExternalWords { external: usize, total: usize },
    ExternalIndicator { word: String },
}

impl GuardRejection {
    pub fn describe(&self) -> String {
        match self {
            GuardRejection::SuspiciousPattern { phrase } => {
                format!("answer leans on outside knowledge ('{phrase}')")
            }
            GuardRejection::NoContentWords => "answer has no content words".to_string(),
            GuardRejection::InsufficientOverlap { ratio } => format!(
                "only {:.0}% of answer words appear in the reference (minimum {:.0}%)",
                ratio * 100.0,
                MIN_OVERLAP_RATIO * 100.0
            ),
            GuardRejection::TooManyExternalWords { external, total } => {
                format!("{external} of {total} answer words are absent from the reference")
            }
            GuardRejection::ExternalIndicator { word } => {
                format!("answer cites an outside source ('{word}')")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardVerdict {
    pub acceptable: bool,
    /// The answer itself when acceptable, otherwise the replacement refusal.
    pub corrected_text: String,
    pub rejection: Option<GuardRejection>,
}

impl GuardVerdict {
    fn accept(text: &str) -> Self {
        Self {
            acceptable: true,
            corrected_text: text.to_string(),
            rejection: None,
        }
    }

    fn reject(rejection: GuardRejection) -> Self {
        Self {
            acceptable: false,
            corrected_text: RefusalReason::ValidationFailed.refusal().text().to_string(),
            rejection: Some(rejection),
        }
    }
}

/// Word-level breakdown of one review, for operator logs.
#[derive(Debug, Clone, Serialize)]
pub struct GuardDetails {
    pub acceptable: bool,
    pub is_refusal: bool,
    pub has_suspicious_pattern: bool,
    pub overlap_ratio: f64,
    pub answer_word_count: usize,
    pub reference_word_count: usize,
    pub overlap_word_count: usize,
    pub external_word_count: usize,
    /// Alphabetical sample.
    pub overlap_words: Vec<String>,
    /// Alphabetical sample.
    pub external_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GroundingGuard;

impl GroundingGuard {
    pub fn new() -> Self {
        Self
    }

    /// Refusal sentences the guard lets through unconditionally.
    pub fn refusals(&self) -> &'static [CanonicalRefusal] {
        &CanonicalRefusal::ALL
    }

    pub fn review(&self, answer: &str, reference: &str) -> GuardVerdict {
        if CanonicalRefusal::from_text(answer).is_some() {
            return GuardVerdict::accept(answer);
        }

        if let Some(phrase) = suspicious_phrase(answer) {
            return GuardVerdict::reject(GuardRejection::SuspiciousPattern { phrase });
        }

        let answer_words = content_words(answer);
        if answer_words.is_empty() {
            return GuardVerdict::reject(GuardRejection::NoContentWords);
        }
        let reference_words = content_words(reference);

        let ratio = overlap_ratio(&answer_words, &reference_words);
        if ratio < MIN_OVERLAP_RATIO {
            return GuardVerdict::reject(GuardRejection::InsufficientOverlap { ratio });
        }

        let external: HashSet<&String> = answer_words.difference(&reference_words).collect();
        if external.len() as f64 > answer_words.len() as f64 * MAX_EXTERNAL_RATIO {
            return GuardVerdict::reject(GuardRejection::TooManyExternalWords {
                external: external.len(),
                total: answer_words.len(),
            });
        }
        if let Some(word) = EXTERNAL_INDICATORS
            .iter()
            .find(|w| external.iter().any(|e| e.as_str() == **w))
        {
            return GuardVerdict::reject(GuardRejection::ExternalIndicator {
                word: word.to_string(),
            });
        }

        GuardVerdict::accept(answer)
    }

    pub fn details(&self, answer: &str, reference: &str) -> GuardDetails {
        let verdict = self.review(answer, reference);
        let answer_words = content_words(answer);
        let reference_words = content_words(reference);

        let mut overlap: Vec<String> = answer_words.intersection(&reference_words).cloned().collect();
        let mut external: Vec<String> = answer_words.difference(&reference_words).cloned().collect();
        overlap.sort();
        external.sort();
        let (overlap_count, external_count) = (overlap.len(), external.len());
        overlap.truncate(DETAIL_SAMPLE);
        external.truncate(DETAIL_SAMPLE);

        GuardDetails {
            acceptable: verdict.acceptable,
            is_refusal: CanonicalRefusal::from_text(answer).is_some(),
            has_suspicious_pattern: suspicious_phrase(answer).is_some(),
            overlap_ratio: overlap_ratio(&answer_words, &reference_words),
            answer_word_count: answer_words.len(),
            reference_word_count: reference_words.len(),
            overlap_word_count: overlap_count,
            external_word_count: external_count,
            overlap_words: overlap,
            external_words: external,
        }
    }
}

fn suspicious_phrase(answer: &str) -> Option<String> {
    let lowered = answer.to_lowercase();
    SUSPICIOUS
        .iter()
        .find_map(|re| re.find(&lowered).map(|m| m.as_str().to_string()))
}

fn overlap_ratio(answer: &HashSet<String>, reference: &HashSet<String>) -> f64 {
    if answer.is_empty() {
        return 0.0;
    }
    answer.intersection(reference).count() as f64 / answer.len() as f64
}
