// Answer generation: prompt assembly and the Generator seam.
// All model calls go through a `Generator`; `llm_client::LlmClient` is the
// production implementation.

pub mod generator;
pub mod prompts;

#[cfg(test)]
pub use generator::{Reply, ScriptedGenerator};
pub use generator::{
    assemble_prompt, generate_with_timeout, AssembledPrompt, GenerationOutcome, Generator,
};
