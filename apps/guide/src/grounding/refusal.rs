//! The three canonical refusal sentences and everything that maps onto them.
//!
//! Every refusal the guide emits is exactly one of these sentences, byte for
//! byte. Free-form "sorry, I can't" text from the model is repaired onto the
//! closest sentence or replaced by the one mapped from the refusal reason.

use serde::Serialize;

pub const REPAIR_CONFIDENCE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalRefusal {
    Context,
    Data,
    KnowledgeLimited,
}

impl CanonicalRefusal {
    pub const ALL: [CanonicalRefusal; 3] = [
        CanonicalRefusal::Context,
        CanonicalRefusal::Data,
        CanonicalRefusal::KnowledgeLimited,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            CanonicalRefusal::Context => "This isn't covered in my local context.",
            CanonicalRefusal::Data => "I don't have enough local data to answer that.",
            CanonicalRefusal::KnowledgeLimited => {
                "My knowledge is limited to what's in the context file."
            }
        }
    }

    /// Exact match only.
    pub fn from_text(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.text() == text)
    }

    /// Reason recorded when the model itself chose this sentence.
    pub fn reason(&self) -> RefusalReason {
        match self {
            CanonicalRefusal::Context => RefusalReason::MissingContext,
            CanonicalRefusal::Data => RefusalReason::InsufficientData,
            CanonicalRefusal::KnowledgeLimited => RefusalReason::GeneralLimitation,
        }
    }

    /// (primary cue, secondary cues) used to recognise a paraphrase.
    fn cues(&self) -> (&'static str, [&'static str; 2]) {
        match self {
            CanonicalRefusal::Context => ("context", ["cover", "local"]),
            CanonicalRefusal::Data => ("data", ["enough", "local"]),
            CanonicalRefusal::KnowledgeLimited => ("knowledge", ["limited", "context"]),
        }
    }

    /// Share of this sentence's cues present in `lowered`; zero without the
    /// primary cue.
    fn cue_confidence(&self, lowered: &str) -> f64 {
        let (primary, secondary) = self.cues();
        if !lowered.contains(primary) {
            return 0.0;
        }
        let hits = 1 + secondary.iter().filter(|cue| lowered.contains(*cue)).count();
        hits as f64 / 3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefusalReason {
    MissingContext,
    OutOfScope,
    InsufficientData,
    GeneralLimitation,
    ValidationFailed,
    GenerationFailure,
}

impl RefusalReason {
    pub fn refusal(&self) -> CanonicalRefusal {
        match self {
            RefusalReason::MissingContext | RefusalReason::OutOfScope => CanonicalRefusal::Context,
            RefusalReason::InsufficientData => CanonicalRefusal::Data,
            RefusalReason::GeneralLimitation
            | RefusalReason::ValidationFailed
            | RefusalReason::GenerationFailure => CanonicalRefusal::KnowledgeLimited,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalReason::MissingContext => "missing-context",
            RefusalReason::OutOfScope => "out-of-scope",
            RefusalReason::InsufficientData => "insufficient-data",
            RefusalReason::GeneralLimitation => "general-limitation",
            RefusalReason::ValidationFailed => "validation-failed",
            RefusalReason::GenerationFailure => "generation-failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairGuess {
    pub refusal: CanonicalRefusal,
    pub confidence: f64,
}

/// First sentence, in canonical order, whose cue confidence reaches the
/// threshold.
pub fn classify_refusal(text: &str) -> Option<RepairGuess> {
    let lowered = text.to_lowercase();
    CanonicalRefusal::ALL
        .into_iter()
        .map(|refusal| RepairGuess {
            refusal,
            confidence: refusal.cue_confidence(&lowered),
        })
        .find(|guess| guess.confidence >= REPAIR_CONFIDENCE_THRESHOLD)
}

/// Picks the canonical sentence `text` should become.
///
/// Canonical text (surrounding whitespace aside) maps to itself; a
/// recognisable paraphrase is repaired; anything else gets the sentence for
/// `reason`, or the knowledge-limited one when no reason is known.
pub fn canonicalize(text: &str, reason: Option<RefusalReason>) -> CanonicalRefusal {
    if let Some(exact) = CanonicalRefusal::from_text(text.trim()) {
        return exact;
    }
    if let Some(guess) = classify_refusal(text) {
        return guess.refusal;
    }
    reason
        .map(|r| r.refusal())
        .unwrap_or(CanonicalRefusal::KnowledgeLimited)
}

pub fn ensure_canonical(text: &str, reason: Option<RefusalReason>) -> &'static str {
    canonicalize(text, reason).text()
}

/// First canonical sentence embedded verbatim in `text`. Case and whitespace
/// are significant.
pub fn refusal_signal(text: &str) -> Option<CanonicalRefusal> {
    CanonicalRefusal::ALL
        .into_iter()
        .find(|r| text.contains(r.text()))
}

pub fn is_refusal_signal(text: &str) -> bool {
    refusal_signal(text).is_some()
}

#[derive(Debug, Clone, Serialize)]
pub struct PhraseCount {
    pub refusal: CanonicalRefusal,
    pub text: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefusalStatistics {
    pub total_responses: usize,
    pub refusal_count: usize,
    pub refusal_rate: f64,
    pub phrase_distribution: Vec<PhraseCount>,
    /// Responses that carry no canonical sentence but would be repaired to one.
    pub malformed_refusals: usize,
    pub most_used: Option<CanonicalRefusal>,
}

pub fn statistics<'a, I>(responses: I) -> RefusalStatistics
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = [0usize; 3];
    let mut total = 0;
    let mut refusals = 0;
    let mut malformed = 0;

    for response in responses {
        total += 1;
        match refusal_signal(response) {
            Some(refusal) => {
                refusals += 1;
                counts[refusal as usize] += 1;
            }
            None if classify_refusal(response).is_some() => malformed += 1,
            None => {}
        }
    }

    let phrase_distribution: Vec<PhraseCount> = CanonicalRefusal::ALL
        .into_iter()
        .map(|refusal| PhraseCount {
            refusal,
            text: refusal.text(),
            count: counts[refusal as usize],
        })
        .collect();

    let mut most_used: Option<&PhraseCount> = None;
    for phrase in phrase_distribution.iter().filter(|p| p.count > 0) {
        if most_used.map_or(true, |m| phrase.count > m.count) {
            most_used = Some(phrase);
        }
    }
    let most_used = most_used.map(|p| p.refusal);

    RefusalStatistics {
        total_responses: total,
        refusal_count: refusals,
        refusal_rate: if total > 0 {
            refusals as f64 / total as f64
        } else {
            0.0
        },
        phrase_distribution,
        malformed_refusals: malformed,
        most_used,
    }
}
