// Sessions: the per-session pipeline orchestrator, the registry that owns
// them, and the HTTP handlers on top.

pub mod handlers;
pub mod orchestrator;
pub mod registry;

pub use orchestrator::{PipelineSettings, SessionError, SessionPhase};
pub use registry::SessionRegistry;
