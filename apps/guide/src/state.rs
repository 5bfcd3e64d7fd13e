use std::sync::Arc;

use crate::config::Config;
use crate::generation::Generator;
use crate::reference::ReferenceSource;
use crate::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    /// Same source the sessions load from; read directly by the health report.
    pub source: Arc<dyn ReferenceSource>,
    /// Pluggable text generator. Default: `LlmClient`.
    pub generator: Arc<dyn Generator>,
    pub config: Config,
}
