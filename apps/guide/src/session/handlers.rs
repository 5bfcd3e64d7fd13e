use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Answer, Query};
use crate::reference::City;
use crate::session::orchestrator::{
    CitySelection, Interaction, SessionStatus, UsageStatistics,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SelectCityRequest {
    pub city: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct CityInfo {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub status: SessionStatus,
}

/// An answer as the caller sees it. The diagnostic is attached only when the
/// service runs with diagnostics exposed.
#[derive(Serialize)]
pub struct AnswerBody {
    #[serde(flatten)]
    pub answer: Answer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

#[derive(Serialize)]
pub struct InteractionBody {
    pub query: Query,
    pub answer: AnswerBody,
}

impl InteractionBody {
    fn new(interaction: Interaction, expose_diagnostics: bool) -> Self {
        let diagnostic = if expose_diagnostics {
            interaction.answer.diagnostic.clone()
        } else {
            None
        };
        Self {
            query: interaction.query,
            answer: AnswerBody {
                answer: interaction.answer,
                diagnostic,
            },
        }
    }
}

/// GET /api/v1/cities
pub async fn handle_list_cities() -> Json<Vec<CityInfo>> {
    Json(
        City::ALL
            .iter()
            .map(|c| CityInfo {
                id: c.id(),
                name: c.display_name(),
            })
            .collect(),
    )
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let (session_id, handle) = state.sessions.create().await;
    let status = handle.lock().await.status();
    (StatusCode::CREATED, Json(SessionCreated { session_id, status }))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/city
pub async fn handle_select_city(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectCityRequest>,
) -> Result<Json<CitySelection>, AppError> {
    let session = state.sessions.get(id).await?;
    let selection = session.lock().await.select_city(&req.city)?;
    Ok(Json(selection))
}

/// POST /api/v1/sessions/:id/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<InteractionBody>, AppError> {
    let session = state.sessions.get(id).await?;
    let interaction = session.lock().await.process_query(&req.query).await?;
    Ok(Json(InteractionBody::new(
        interaction,
        state.config.expose_diagnostics,
    )))
}

/// GET /api/v1/sessions/:id/history
pub async fn handle_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InteractionBody>>, AppError> {
    let session = state.sessions.get(id).await?;
    let history = session.lock().await.history().to_vec();
    Ok(Json(
        history
            .into_iter()
            .map(|i| InteractionBody::new(i, state.config.expose_diagnostics))
            .collect(),
    ))
}

/// GET /api/v1/sessions/:id/status
pub async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>, AppError> {
    let session = state.sessions.get(id).await?;
    let status = session.lock().await.status();
    Ok(Json(status))
}

/// GET /api/v1/sessions/:id/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsageStatistics>, AppError> {
    let session = state.sessions.get(id).await?;
    let stats = session.lock().await.usage_statistics();
    Ok(Json(stats))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut orchestrator = session.lock().await;
    orchestrator.reset();
    Ok(Json(orchestrator.status()))
}
