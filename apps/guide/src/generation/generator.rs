//! Prompt assembly and the seam to the external language model.
//!
//! The model is opaque: it takes an assembled prompt and returns text, or
//! fails. Every call is resolved once, here, into a `GenerationOutcome`, so
//! callers never see transport errors, empty output or timeouts directly.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::generation::prompts::{
    CLOSING_REMINDER, FULL_CONTEXT_TEMPLATE, GUIDE_SYSTEM_TEMPLATE, PASSAGE_TEMPLATE,
    RELEVANT_PASSAGES_HEADING, TIME_CONTEXT_TEMPLATE,
};
use crate::grounding::CanonicalRefusal;
use crate::llm_client::LlmError;
use crate::reference::{Passage, ReferenceDocument};
use crate::retrieval::TimeContext;

const PROBE_SYSTEM: &str = "Reply with the single word: ready";
const PROBE_QUERY: &str = "ready?";

/// A prompt ready to send: system instructions plus the user's turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator trait
// ────────────────────────────────────────────────────────────────────────────

/// The external text generator. Implement this to swap model backends
/// without touching the pipeline.
///
/// Carried in `AppState` as `Arc<dyn Generator>`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;

    /// Live round trip used by the component health report.
    async fn probe(&self) -> Result<(), LlmError> {
        let prompt = AssembledPrompt {
            system: PROBE_SYSTEM.to_string(),
            user: PROBE_QUERY.to_string(),
        };
        self.generate(&prompt).await.map(|_| ())
    }
}

/// Result of one generation call, already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Trimmed, non-empty model output.
    Text(String),
    /// Operator-facing detail of why no text came back.
    Failure(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt assembly
// ────────────────────────────────────────────────────────────────────────────

/// Builds the constrained prompt for one query.
///
/// `passages` must come from `document`; the caller checks that before
/// assembling. With no passages the full document alone carries the context.
pub fn assemble_prompt(
    query: &str,
    document: &ReferenceDocument,
    passages: &[Passage],
    time: &TimeContext,
) -> AssembledPrompt {
    let city = document.city().display_name();

    let refusals = CanonicalRefusal::ALL
        .iter()
        .map(|r| format!("- \"{}\"", r.text()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut sections = vec![
        GUIDE_SYSTEM_TEMPLATE
            .replace("{city}", city)
            .replace("{refusals}", &refusals),
        TIME_CONTEXT_TEMPLATE.replace("{time_context}", &time.describe()),
    ];

    if !passages.is_empty() {
        let numbered = passages
            .iter()
            .enumerate()
            .map(|(i, p)| {
                PASSAGE_TEMPLATE
                    .replace("{n}", &(i + 1).to_string())
                    .replace("{section}", &p.section)
                    .replace("{content}", &p.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("{RELEVANT_PASSAGES_HEADING}\n\n{numbered}"));
    }

    sections.push(
        FULL_CONTEXT_TEMPLATE
            .replace("{city}", &city.to_uppercase())
            .replace("{document}", document.text()),
    );
    sections.push(CLOSING_REMINDER.to_string());

    AssembledPrompt {
        system: sections.join("\n\n"),
        user: query.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter boundary
// ────────────────────────────────────────────────────────────────────────────

/// Calls `generator` under `timeout` and resolves the result.
pub async fn generate_with_timeout(
    generator: &dyn Generator,
    prompt: &AssembledPrompt,
    timeout: Duration,
) -> GenerationOutcome {
    match tokio::time::timeout(timeout, generator.generate(prompt)).await {
        Ok(Ok(text)) => {
            let text = text.trim();
            if text.is_empty() {
                warn!("Generator {} returned empty output", generator.model_id());
                GenerationOutcome::Failure(LlmError::EmptyContent.to_string())
            } else {
                debug!("Generator returned {} chars", text.len());
                GenerationOutcome::Text(text.to_string())
            }
        }
        Ok(Err(e)) => {
            warn!("Generator {} failed: {}", generator.model_id(), e);
            GenerationOutcome::Failure(e.to_string())
        }
        Err(_) => {
            warn!(
                "Generator {} timed out after {}s",
                generator.model_id(),
                timeout.as_secs()
            );
            GenerationOutcome::Failure(format!(
                "generation timed out after {}s",
                timeout.as_secs()
            ))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted generator for tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub use scripted::{Reply, ScriptedGenerator};

#[cfg(test)]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub enum Reply {
        Text(String),
        Error(LlmError),
        /// Never answers; exercises the timeout.
        Stall,
    }

    /// Replays queued replies in order and records every prompt it sees.
    /// An exhausted script answers with `EmptyContent`.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Reply>>,
        prompts: Mutex<Vec<AssembledPrompt>>,
    }

    impl ScriptedGenerator {
        pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::default(),
            }
        }

        pub fn text(reply: &str) -> Self {
            Self::new([Reply::Text(reply.to_string())])
        }

        pub fn prompts(&self) -> Vec<AssembledPrompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Error(e)) => Err(e),
                Some(Reply::Stall) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(LlmError::EmptyContent)
                }
                None => Err(LlmError::EmptyContent),
            }
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures::DINDIGUL_REFERENCE;
    use crate::reference::City;
    use crate::retrieval::{rank, FixedClock, TimePeriod};
    use chrono::Utc;

    fn dindigul() -> ReferenceDocument {
        ReferenceDocument::new(
            City::Dindigul,
            DINDIGUL_REFERENCE.to_string(),
            "memory://dindigul".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    fn noon() -> TimeContext {
        TimeContext::from_clock(&FixedClock::at(12, 30))
    }

    #[test]
    fn test_prompt_contains_every_required_part() {
        let doc = dindigul();
        let passages = rank(Some(&doc), "biryani lunch", City::Dindigul, 2, TimePeriod::Afternoon);
        let prompt = assemble_prompt("Where to eat biryani?", &doc, &passages, &noon());

        assert_eq!(prompt.user, "Where to eat biryani?");
        assert!(prompt.system.contains("Local Guide for Dindigul"));
        for refusal in CanonicalRefusal::ALL {
            assert!(prompt.system.contains(refusal.text()));
        }
        assert!(prompt.system.contains("TIME CONTEXT: Current time: 12:30 PM (afternoon)."));
        assert!(prompt.system.contains("RELEVANT LOCAL INFORMATION:"));
        assert!(prompt.system.contains("1. Food:\nDindigul Biryani"));
        assert!(prompt.system.contains("FULL DINDIGUL CONTEXT:"));
        assert!(prompt.system.contains(DINDIGUL_REFERENCE));
        assert!(prompt.system.ends_with(CLOSING_REMINDER));
    }

    #[test]
    fn test_prompt_without_passages_falls_back_to_full_document() {
        let doc = dindigul();
        let prompt = assemble_prompt("anything", &doc, &[], &noon());
        assert!(!prompt.system.contains(RELEVANT_PASSAGES_HEADING));
        assert!(prompt.system.contains(DINDIGUL_REFERENCE));
    }

    #[test]
    fn test_prompt_never_mentions_other_city() {
        let doc = dindigul();
        let passages = rank(Some(&doc), "rock fort", City::Dindigul, 3, TimePeriod::Morning);
        let prompt = assemble_prompt("rock fort", &doc, &passages, &noon());
        assert!(!prompt.system.to_lowercase().contains("madurai"));
    }

    fn prompt() -> AssembledPrompt {
        AssembledPrompt {
            system: "system".to_string(),
            user: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_text_is_trimmed() {
        let generator = ScriptedGenerator::text("  Vaanga!  \n");
        let outcome = generate_with_timeout(&generator, &prompt(), Duration::from_secs(5)).await;
        assert_eq!(outcome, GenerationOutcome::Text("Vaanga!".to_string()));
        assert_eq!(generator.prompts(), vec![prompt()]);
    }

    #[tokio::test]
    async fn test_blank_output_is_a_failure() {
        let generator = ScriptedGenerator::text("   ");
        let outcome = generate_with_timeout(&generator, &prompt(), Duration::from_secs(5)).await;
        assert!(matches!(outcome, GenerationOutcome::Failure(_)));
    }

    #[tokio::test]
    async fn test_errors_become_failures() {
        let generator = ScriptedGenerator::new([Reply::Error(LlmError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        })]);
        let outcome = generate_with_timeout(&generator, &prompt(), Duration::from_secs(5)).await;
        assert_eq!(
            outcome,
            GenerationOutcome::Failure("API error (status 401): invalid x-api-key".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let generator = ScriptedGenerator::new([Reply::Stall]);
        let outcome = generate_with_timeout(&generator, &prompt(), Duration::from_secs(2)).await;
        assert_eq!(
            outcome,
            GenerationOutcome::Failure("generation timed out after 2s".to_string())
        );
    }

    #[tokio::test]
    async fn test_default_probe_uses_generate() {
        let generator = ScriptedGenerator::text("ready");
        assert!(generator.probe().await.is_ok());
        assert!(ScriptedGenerator::default().probe().await.is_err());
    }
}
