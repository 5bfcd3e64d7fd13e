pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/health/components",
            get(health::component_health_handler),
        )
        .route("/api/v1/cities", get(handlers::handle_list_cities))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", delete(handlers::handle_end_session))
        .route("/api/v1/sessions/:id/city", post(handlers::handle_select_city))
        .route("/api/v1/sessions/:id/ask", post(handlers::handle_ask))
        .route("/api/v1/sessions/:id/history", get(handlers::handle_history))
        .route("/api/v1/sessions/:id/status", get(handlers::handle_status))
        .route("/api/v1/sessions/:id/stats", get(handlers::handle_stats))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::generation::{Generator, ScriptedGenerator};
    use crate::grounding::CanonicalRefusal;
    use crate::reference::{InMemorySource, ReferenceSource};
    use crate::retrieval::FixedClock;
    use crate::session::{PipelineSettings, SessionRegistry};

    fn app(generator: ScriptedGenerator, expose_diagnostics: bool) -> Router {
        let source: Arc<dyn ReferenceSource> = Arc::new(InMemorySource::both_cities());
        let generator: Arc<dyn Generator> = Arc::new(generator);
        let config = Config {
            anthropic_api_key: "sk-test".to_string(),
            reference_dir: PathBuf::from("context"),
            port: 0,
            rust_log: "debug".to_string(),
            generation_timeout: Duration::from_secs(5),
            retrieval_top_k: 3,
            session_idle_ttl: Duration::from_secs(3600),
            expose_diagnostics,
        };
        let sessions = SessionRegistry::new(
            source.clone(),
            generator.clone(),
            Arc::new(FixedClock::at(12, 30)),
            PipelineSettings {
                top_k: config.retrieval_top_k,
                generation_timeout: config.generation_timeout,
            },
            config.session_idle_ttl,
        );
        build_router(AppState {
            sessions: Arc::new(sessions),
            source,
            generator,
            config,
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"]["phase"], "city_unselected");
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(ScriptedGenerator::default(), false);
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "guide");

        let (status, body) = send(&app, "GET", "/api/v1/health/components", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_list_cities() {
        let app = app(ScriptedGenerator::default(), false);
        let (_, body) = send(&app, "GET", "/api/v1/cities", None).await;
        assert_eq!(
            body,
            json!([
                {"id": "madurai", "name": "Madurai"},
                {"id": "dindigul", "name": "Dindigul"}
            ])
        );
    }

    #[tokio::test]
    async fn test_ask_before_selecting_city_is_conflict() {
        let app = app(ScriptedGenerator::default(), false);
        let id = new_session(&app).await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/ask"),
            Some(json!({"query": "Where to eat?"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_unsupported_city_is_bad_request() {
        let app = app(ScriptedGenerator::default(), false);
        let id = new_session(&app).await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/city"),
            Some(json!({"city": "Chennai"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("Chennai"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app(ScriptedGenerator::default(), false);
        let uri = format!("/api/v1/sessions/{}/status", uuid::Uuid::new_v4());
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_conversation() {
        let app = app(
            ScriptedGenerator::text("Jigarthanda is the signature cold drink of Madurai."),
            false,
        );
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/city"),
            Some(json!({"city": "madurai"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["city"], "madurai");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/ask"),
            Some(json!({"query": "Where to drink Jigarthanda?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"]["topic"], "food");
        assert_eq!(body["answer"]["is_refusal"], false);
        assert_eq!(body["answer"]["source"]["kind"], "reference");

        let (_, history) = send(&app, "GET", &format!("/api/v1/sessions/{id}/history"), None).await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let (_, stats) = send(&app, "GET", &format!("/api/v1/sessions/{id}/stats"), None).await;
        assert_eq!(stats["total_queries"], 1);
        assert_eq!(stats["answered"], 1);

        let (status, body) = send(&app, "POST", &format!("/api/v1/sessions/{id}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "city_unselected");
        assert_eq!(body["conversation_length"], 0);

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{id}/status"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_diagnostics_only_when_exposed() {
        for expose in [false, true] {
            let app = app(ScriptedGenerator::default(), expose);
            let id = new_session(&app).await;
            send(
                &app,
                "POST",
                &format!("/api/v1/sessions/{id}/city"),
                Some(json!({"city": "dindigul"})),
            )
            .await;

            // Exhausted script: the generator fails and the answer is a refusal.
            let (status, body) = send(
                &app,
                "POST",
                &format!("/api/v1/sessions/{id}/ask"),
                Some(json!({"query": "Where to eat biryani?"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["answer"]["text"], CanonicalRefusal::KnowledgeLimited.text());
            assert_eq!(body["answer"].get("diagnostic").is_some(), expose);
        }
    }
}
