//! Topic scope gate. Runs before any retrieval or generation and never
//! touches the reference document or the clock, so the same text always gets
//! the same decision.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::reference::City;
use crate::text::{contains_whole_word, content_words};

pub const MAX_QUERY_CHARS: usize = 1000;

const WHOLE_WORD_HIT: u32 = 2;
const SUBSTRING_HIT: u32 = 1;

/// Phrases that, next to a supported city's name, make a broad overview
/// question in scope even when no topic keyword matches.
const OVERVIEW_PHRASES: &[&str] = &[
    "tell me about",
    "what about",
    "about",
    "describe",
    "information",
    "know about",
    "learn about",
    "explain",
    "overview",
    "guide",
];

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static SHOUTING: Lazy<Regex> = Lazy::new(|| Regex::new(r"[!?]{3,}").expect("valid regex"));
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Food,
    Transport,
    Slang,
    Safety,
    Lifestyle,
}

impl Topic {
    /// Registration order. Score ties go to the earlier topic.
    pub const ALL: [Topic; 5] = [
        Topic::Food,
        Topic::Transport,
        Topic::Slang,
        Topic::Safety,
        Topic::Lifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Food => "food",
            Topic::Transport => "transport",
            Topic::Slang => "slang",
            Topic::Safety => "safety",
            Topic::Lifestyle => "lifestyle",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Food => &[
                "food", "eat", "restaurant", "meal", "dish", "cuisine", "biryani", "idli", "dosa",
                "curry", "sweet", "snack", "breakfast", "lunch", "dinner", "drink", "tea",
                "coffee", "jigarthanda", "thalappakatti", "hotel", "mess", "cooking", "recipe",
                "taste", "spicy", "traditional",
            ],
            Topic::Transport => &[
                "transport", "bus", "auto", "rickshaw", "taxi", "train", "railway", "station",
                "route", "travel", "journey", "fare", "ticket", "road", "highway", "airport",
                "metro", "share", "vehicle", "driving", "walk",
            ],
            Topic::Slang => &[
                "slang", "language", "phrase", "word", "speak", "say", "call", "meaning",
                "tamil", "local", "dialect", "accent", "expression", "greeting", "common",
                "people say", "how to say", "what does", "pronunciation", "conversation",
            ],
            Topic::Safety => &[
                "safety", "safe", "danger", "crime", "police", "emergency", "help", "secure",
                "avoid", "careful", "precaution", "risk", "problem", "trouble", "area", "night",
                "alone", "tourist", "scam", "theft", "hospital", "ambulance", "fire",
            ],
            Topic::Lifestyle => &[
                "lifestyle", "culture", "custom", "tradition", "festival", "celebration",
                "shopping", "market", "temple", "worship", "dress", "clothing", "weather",
                "climate", "season", "people", "behavior", "etiquette", "social", "family",
                "marriage", "business", "work", "education", "entertainment", "music", "dance",
                "art", "history", "things", "try", "do", "visit", "see", "experience",
                "activity", "activities", "now", "today", "currently", "what", "where", "when",
                "recommend", "suggest",
            ],
        }
    }

    /// Keyword score of a lowercase query: 2 per whole-word hit, 1 per
    /// substring-only hit.
    fn score(&self, lowered: &str) -> u32 {
        self.keywords()
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .map(|kw| {
                if contains_whole_word(lowered, kw) {
                    WHOLE_WORD_HIT
                } else {
                    SUBSTRING_HIT
                }
            })
            .sum()
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a query was turned away before reaching retrieval.
/// Serializes as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooLong,
    NonAlphabetic,
    OutOfScope,
}

impl Rejection {
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::TooLong => "too long",
            Rejection::NonAlphabetic => "non-alphabetic",
            Rejection::OutOfScope => "out-of-scope",
        }
    }

    /// User-facing explanation.
    pub fn message(&self) -> String {
        match self {
            Rejection::Empty => "Query is empty or contains only whitespace.".to_string(),
            Rejection::TooLong => format!(
                "Query is too long (over {MAX_QUERY_CHARS} characters). Please keep questions concise."
            ),
            Rejection::NonAlphabetic => {
                "Query contains only special characters or numbers.".to_string()
            }
            Rejection::OutOfScope => format!(
                "Query is outside supported topics. I can help with: {}.",
                topic_list()
            ),
        }
    }
}

impl Serialize for Rejection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

fn topic_list() -> String {
    Topic::ALL
        .iter()
        .map(Topic::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeDecision {
    pub is_valid: bool,
    pub topic: Option<Topic>,
    pub rejection: Option<Rejection>,
}

impl ScopeDecision {
    fn accepted(topic: Option<Topic>) -> Self {
        Self {
            is_valid: true,
            topic,
            rejection: None,
        }
    }

    fn rejected(rejection: Rejection) -> Self {
        Self {
            is_valid: false,
            topic: None,
            rejection: Some(rejection),
        }
    }
}

/// Decides whether a query is one the guide may answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeGate;

impl ScopeGate {
    pub fn new() -> Self {
        Self
    }

    pub fn topics(&self) -> &'static [Topic] {
        &Topic::ALL
    }

    /// Collapses whitespace, trims, squeezes `!!!`/`???` runs to `?` and long
    /// dot runs to `...`.
    pub fn preprocess(&self, raw: &str) -> String {
        let collapsed = WHITESPACE_RUN.replace_all(raw.trim(), " ");
        let squeezed = SHOUTING.replace_all(&collapsed, "?");
        ELLIPSIS.replace_all(&squeezed, "...").into_owned()
    }

    /// Classifies `raw`. The length limit applies to the trimmed raw text;
    /// everything else runs on the preprocessed form.
    pub fn classify(&self, raw: &str) -> ScopeDecision {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ScopeDecision::rejected(Rejection::Empty);
        }
        if trimmed.chars().count() > MAX_QUERY_CHARS {
            return ScopeDecision::rejected(Rejection::TooLong);
        }

        let query = self.preprocess(trimmed);
        if !query.chars().any(|c| c.is_ascii_alphabetic()) {
            return ScopeDecision::rejected(Rejection::NonAlphabetic);
        }

        let lowered = query.to_lowercase();
        let topic = best_topic(&lowered);
        if topic.is_some() || is_city_overview(&lowered) {
            ScopeDecision::accepted(topic)
        } else {
            ScopeDecision::rejected(Rejection::OutOfScope)
        }
    }

    /// Topics with a keyword containing one of the query's words; every
    /// topic when nothing matches.
    pub fn suggest_topics(&self, query: &str) -> Vec<Topic> {
        let words = content_words(query);
        let suggestions: Vec<Topic> = Topic::ALL
            .into_iter()
            .filter(|topic| {
                topic
                    .keywords()
                    .iter()
                    .any(|kw| words.iter().any(|w| kw.contains(w.as_str())))
            })
            .collect();

        if suggestions.is_empty() {
            Topic::ALL.to_vec()
        } else {
            suggestions
        }
    }
}

fn best_topic(lowered: &str) -> Option<Topic> {
    let mut best: Option<(Topic, u32)> = None;
    for topic in Topic::ALL {
        let score = topic.score(lowered);
        // strictly greater: first registered topic keeps a tie
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((topic, score));
        }
    }
    best.map(|(topic, _)| topic)
}

fn is_city_overview(lowered: &str) -> bool {
    City::ALL.iter().any(|city| lowered.contains(city.id()))
        && OVERVIEW_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}
