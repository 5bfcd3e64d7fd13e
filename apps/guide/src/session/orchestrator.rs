//! Orchestrator: one session's pipeline state machine.
//!
//! Uninitialized -> CityUnselected -> CityReady -> ProcessingQuery -> CityReady
//!
//! Only configuration problems (no city, bad city, missing reference) reach
//! the caller as errors. Everything that goes wrong while answering a query
//! becomes a canonical refusal, is logged, and the session goes back to
//! CityReady.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::generation::{assemble_prompt, generate_with_timeout, GenerationOutcome, Generator};
use crate::grounding::{
    refusal_signal, statistics, GroundingGuard, RefusalReason, RefusalStatistics,
};
use crate::models::{Answer, AnswerSource, Query};
use crate::reference::{
    City, Passage, ReferenceDocument, ReferenceError, ReferenceSource, ReferenceStore,
};
use crate::retrieval::{
    rank, retrieval_stats, Clock, RetrievalStats, TimeContext, DEFAULT_TOP_K,
};
use crate::scope::{Rejection, ScopeGate};

const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    CityUnselected,
    CityReady,
    ProcessingQuery,
}

/// Configuration errors. These are the only failures a caller ever sees.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is not initialized")]
    NotInitialized,

    #[error("No city selected. Please select a city first.")]
    NoCitySelected,

    #[error("Session {0} not found")]
    UnknownSession(uuid::Uuid),

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Failures inside the answering pipeline. Never returned to callers; each
/// one is turned into a general-limitation refusal.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no reference document loaded for {city}")]
    MissingReference { city: City },

    #[error("city isolation violated: {item} belongs to {found}, query targets {expected}")]
    IsolationViolation {
        expected: City,
        found: City,
        item: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub generation_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

/// One completed turn.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub query: Query,
    pub answer: Answer,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitySelection {
    pub city: City,
    pub passages: usize,
    pub summary: String,
    /// False when the document names another city too often.
    pub isolated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub city: Option<City>,
    pub document_loaded: bool,
    pub conversation_length: usize,
    pub reference_summary: Option<String>,
    pub retrieval: Option<RetrievalStats>,
    pub model: String,
    pub available_cities: Vec<City>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStatistics {
    pub total_queries: usize,
    pub answered: usize,
    pub refusals: usize,
    pub refusal_rate: f64,
    pub city: Option<City>,
    pub first_query_at: Option<DateTime<Utc>>,
    pub last_query_at: Option<DateTime<Utc>>,
    pub refusal_statistics: RefusalStatistics,
}

pub struct Orchestrator {
    phase: SessionPhase,
    store: ReferenceStore,
    history: Vec<Interaction>,
    pipeline: Pipeline,
}

/// The answering stages. Kept apart from the session state so a query can
/// borrow them while the phase is held by a `ProcessingGuard`.
struct Pipeline {
    gate: ScopeGate,
    guard: GroundingGuard,
    generator: Arc<dyn Generator>,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
}

/// Holds the session in ProcessingQuery and puts the previous phase back when
/// dropped, including when the query future is cancelled or a stage panics.
struct ProcessingGuard<'a> {
    phase: &'a mut SessionPhase,
    resume: SessionPhase,
}

impl<'a> ProcessingGuard<'a> {
    fn enter(phase: &'a mut SessionPhase) -> Self {
        let resume = *phase;
        *phase = SessionPhase::ProcessingQuery;
        Self { phase, resume }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        *self.phase = self.resume;
    }
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn ReferenceSource>,
        generator: Arc<dyn Generator>,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            store: ReferenceStore::new(source),
            history: Vec::new(),
            pipeline: Pipeline {
                gate: ScopeGate::new(),
                guard: GroundingGuard::new(),
                generator,
                clock,
                settings,
            },
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn history(&self) -> &[Interaction] {
        &self.history
    }

    pub fn active_city(&self) -> Option<City> {
        self.store.active().map(ReferenceDocument::city)
    }

    /// Idempotent.
    pub fn initialize(&mut self) {
        if self.phase == SessionPhase::Uninitialized {
            self.phase = SessionPhase::CityUnselected;
        }
    }

    /// Loads `city_id` as the session's only reference and starts a fresh
    /// conversation. On failure nothing changes.
    pub fn select_city(&mut self, city_id: &str) -> Result<CitySelection, SessionError> {
        if self.phase == SessionPhase::Uninitialized {
            return Err(SessionError::NotInitialized);
        }

        let (city, passages, summary) = {
            let document = self.store.load(city_id)?;
            (document.city(), document.passages().len(), document.summary())
        };

        let isolated = self.store.validate_isolation(city);
        if !isolated {
            warn!("Reference for {city} failed the isolation check");
        }

        self.history.clear();
        self.phase = SessionPhase::CityReady;
        info!("City selected: {city} ({passages} passages)");

        Ok(CitySelection {
            city,
            passages,
            summary,
            isolated,
        })
    }

    /// Runs one query through the whole pipeline and records the turn.
    pub async fn process_query(&mut self, raw: &str) -> Result<Interaction, SessionError> {
        let city = match (self.phase, self.active_city()) {
            (SessionPhase::Uninitialized, _) => return Err(SessionError::NotInitialized),
            (SessionPhase::CityReady, Some(city)) => city,
            _ => return Err(SessionError::NoCitySelected),
        };

        let processing = ProcessingGuard::enter(&mut self.phase);
        let pipeline = &self.pipeline;

        let query = Query::validate(&pipeline.gate, raw, city, Utc::now());
        let answer = match query.rejection {
            Some(rejection) => {
                info!("Query rejected by scope gate: {}", rejection.label());
                let suggestions = match rejection {
                    Rejection::OutOfScope => pipeline.gate.suggest_topics(&query.text),
                    _ => Vec::new(),
                };
                Answer::rejected(rejection, suggestions)
            }
            None => match pipeline.answer(&self.store, &query).await {
                Ok(answer) => answer,
                Err(e) => {
                    error!("Pipeline error for {city}: {e}");
                    Answer::system_refusal(RefusalReason::GeneralLimitation, e.to_string())
                }
            },
        };

        let interaction = Interaction { query, answer };
        self.history.push(interaction.clone());
        drop(processing);
        Ok(interaction)
    }

    /// Back to CityUnselected with no document, passages or history.
    pub fn reset(&mut self) {
        self.store.clear();
        self.history.clear();
        self.phase = SessionPhase::CityUnselected;
        info!("Session reset");
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            city: self.active_city(),
            document_loaded: self.store.is_loaded(),
            conversation_length: self.history.len(),
            reference_summary: self.store.summary(),
            retrieval: self.store.active().map(retrieval_stats),
            model: self.pipeline.generator.model_id().to_string(),
            available_cities: self.store.available_cities(),
        }
    }

    pub fn usage_statistics(&self) -> UsageStatistics {
        let total = self.history.len();
        let refusals = self.history.iter().filter(|i| i.answer.is_refusal).count();

        UsageStatistics {
            total_queries: total,
            answered: total - refusals,
            refusals,
            refusal_rate: if total > 0 {
                refusals as f64 / total as f64
            } else {
                0.0
            },
            city: self.active_city(),
            first_query_at: self.history.first().map(|i| i.query.asked_at),
            last_query_at: self.history.last().map(|i| i.query.asked_at),
            refusal_statistics: statistics(self.history.iter().map(|i| i.answer.text.as_str())),
        }
    }

}

// ── pipeline ────────────────────────────────────────────────────────────────

impl Pipeline {
    async fn answer(
        &self,
        store: &ReferenceStore,
        query: &Query,
    ) -> Result<Answer, PipelineError> {
        let document = store
            .active()
            .ok_or(PipelineError::MissingReference { city: query.city })?;
        ensure_same_city(query.city, document.city(), "the active reference")?;

        let time = TimeContext::from_clock(self.clock.as_ref());
        let passages = rank(
            Some(document),
            &query.text,
            query.city,
            self.settings.top_k,
            time.period,
        );
        ensure_isolated(query.city, &passages)?;
        debug!(
            "Ranked {} passages for {:?} ({})",
            passages.len(),
            query.topic,
            time.period.as_str()
        );

        let prompt = assemble_prompt(&query.text, document, &passages, &time);
        let passage_ids: Vec<String> = passages.into_iter().map(|p| p.id).collect();

        let outcome = generate_with_timeout(
            self.generator.as_ref(),
            &prompt,
            self.settings.generation_timeout,
        )
        .await;

        Ok(match outcome {
            GenerationOutcome::Failure(detail) => {
                Answer::system_refusal(RefusalReason::GenerationFailure, detail)
            }
            GenerationOutcome::Text(text) => self.check_grounding(text, document, passage_ids),
        })
    }

    fn check_grounding(
        &self,
        text: String,
        document: &ReferenceDocument,
        passage_ids: Vec<String>,
    ) -> Answer {
        let verdict = self.guard.review(&text, document.text());
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                "Grounding details: {:?}",
                self.guard.details(&text, document.text())
            );
        }

        let city = document.city();

        match verdict.rejection {
            Some(rejection) => {
                let detail = rejection.describe();
                warn!("Grounding guard rejected answer: {detail}");
                Answer::refusal(
                    RefusalReason::ValidationFailed.refusal(),
                    RefusalReason::ValidationFailed,
                    AnswerSource::Reference { city, passage_ids },
                    false,
                    Some(detail),
                )
            }
            // Accepted text that carries a refusal sentence is reduced to
            // exactly that sentence.
            None => match refusal_signal(&text) {
                Some(refusal) => Answer::refusal(
                    refusal,
                    refusal.reason(),
                    AnswerSource::Reference { city, passage_ids },
                    true,
                    None,
                ),
                None => Answer::grounded(text, city, passage_ids),
            },
        }
    }
}

fn ensure_same_city(expected: City, found: City, item: &str) -> Result<(), PipelineError> {
    if expected == found {
        Ok(())
    } else {
        Err(PipelineError::IsolationViolation {
            expected,
            found,
            item: item.to_string(),
        })
    }
}

fn ensure_isolated(city: City, passages: &[Passage]) -> Result<(), PipelineError> {
    passages
        .iter()
        .try_for_each(|p| ensure_same_city(city, p.city, &format!("passage {}", p.id)))
}
