//! Passage ranking: lexical overlap with a small time-of-day boost.
//!
//! score = 0.6 * word_overlap + 0.3 * section_overlap + 0.1 * time_boost
//!
//! Each term is capped at 1.0 before weighting and the total is clamped to
//! [0, 1]. Ties keep document order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::reference::{City, Passage, ReferenceDocument};
use crate::retrieval::time_context::{TimePeriod, TIMING_KEYWORDS};
use crate::text::{contains_whole_word, word_tokens};

pub const DEFAULT_TOP_K: usize = 3;

const WORD_OVERLAP_WEIGHT: f64 = 0.6;
const SECTION_OVERLAP_WEIGHT: f64 = 0.3;
const TIME_BOOST_WEIGHT: f64 = 0.1;

const CURRENT_PERIOD_BONUS: f64 = 0.3;
const PERIOD_CONTENT_BONUS: f64 = 0.2;
const TIMING_CONTENT_BONUS: f64 = 0.4;

/// Words in a passage that suggest it talks about opening hours.
const TIMING_VOCABULARY: &[&str] = &[
    "hour", "hours", "time", "timings", "open", "opens", "close", "closes", "closed",
];

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}(:\d{2})?\s?(am|pm)\b").expect("valid clock regex"));

/// Returns up to `k` passages of `document`, best first, with `relevance` set.
///
/// Empty when nothing is loaded or the loaded document belongs to another
/// city; passages of one city are never ranked for another.
pub fn rank(
    document: Option<&ReferenceDocument>,
    query: &str,
    city: City,
    k: usize,
    period: TimePeriod,
) -> Vec<Passage> {
    let Some(document) = document else {
        debug!("No reference loaded for {city}; ranking skipped");
        return Vec::new();
    };
    if document.city() != city {
        debug!(
            "Loaded reference is for {}, not {city}; ranking skipped",
            document.city()
        );
        return Vec::new();
    }

    let mut ranked: Vec<Passage> = document
        .passages()
        .iter()
        .map(|passage| Passage {
            relevance: score_passage(query, passage, period),
            ..passage.clone()
        })
        .collect();

    // sort_by is stable: equal scores keep chunk order
    ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    ranked.truncate(k);
    ranked
}

pub fn score_passage(query: &str, passage: &Passage, period: TimePeriod) -> f64 {
    let query_words = word_tokens(query);

    let (word_overlap, section_overlap) = if query_words.is_empty() {
        (0.0, 0.0)
    } else {
        let content_words = word_tokens(&passage.content);
        let section_words = word_tokens(&passage.section);
        let total = query_words.len() as f64;
        (
            query_words.intersection(&content_words).count() as f64 / total,
            query_words.intersection(&section_words).count() as f64 / total,
        )
    };

    let time_boost = time_sensitivity_boost(
        &query.to_lowercase(),
        &passage.content.to_lowercase(),
        period,
    );

    (WORD_OVERLAP_WEIGHT * word_overlap.min(1.0)
        + SECTION_OVERLAP_WEIGHT * section_overlap.min(1.0)
        + TIME_BOOST_WEIGHT * time_boost.min(1.0))
    .clamp(0.0, 1.0)
}

/// Both arguments lowercase. Result in [0, 1].
fn time_sensitivity_boost(query: &str, content: &str, current: TimePeriod) -> f64 {
    let mut boost = 0.0;

    let period_groups = [
        TimePeriod::Morning,
        TimePeriod::Afternoon,
        TimePeriod::Evening,
        TimePeriod::Night,
    ]
    .map(|p| (Some(p), p.keywords()));
    let groups = period_groups
        .into_iter()
        .chain(std::iter::once((None, TIMING_KEYWORDS)));

    for (period, keywords) in groups {
        if !keywords.iter().any(|kw| contains_whole_word(query, kw)) {
            continue;
        }
        if period == Some(current) {
            boost += CURRENT_PERIOD_BONUS;
        }
        if keywords.iter().any(|kw| contains_whole_word(content, kw)) {
            boost += PERIOD_CONTENT_BONUS;
        }
    }

    let asks_timing = TIMING_KEYWORDS.iter().any(|kw| contains_whole_word(query, kw));
    if asks_timing && mentions_timing(content) {
        boost += TIMING_CONTENT_BONUS;
    }

    f64::min(boost, 1.0)
}

fn mentions_timing(content: &str) -> bool {
    CLOCK_TIME.is_match(content)
        || TIMING_VOCABULARY
            .iter()
            .any(|word| contains_whole_word(content, word))
}

/// Shape of the passages derived from a document.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalStats {
    pub total_passages: usize,
    /// Distinct section titles in document order.
    pub sections: Vec<String>,
}

pub fn retrieval_stats(document: &ReferenceDocument) -> RetrievalStats {
    let mut sections: Vec<String> = Vec::new();
    for passage in document.passages() {
        if !sections.contains(&passage.section) {
            sections.push(passage.section.clone());
        }
    }
    RetrievalStats {
        total_passages: document.passages().len(),
        sections,
    }
}
