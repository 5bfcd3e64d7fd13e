use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::generation::Generator;
use crate::grounding::GroundingGuard;
use crate::reference::{City, ReferenceSource};
use crate::scope::ScopeGate;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}

/// Ordered by severity so the overall status is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub component: &'static str,
    pub status: HealthStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthParams {
    #[serde(default)]
    pub probe: bool,
}

/// GET /api/v1/health/components?probe=bool
pub async fn component_health_handler(
    State(state): State<AppState>,
    Query(params): Query<HealthParams>,
) -> Json<HealthReport> {
    Json(
        component_report(
            state.source.as_ref(),
            state.generator.as_ref(),
            params.probe,
        )
        .await,
    )
}

pub async fn component_report(
    source: &dyn ReferenceSource,
    generator: &dyn Generator,
    probe: bool,
) -> HealthReport {
    let components = vec![
        reference_health(source),
        scope_gate_health(&ScopeGate::new()),
        guard_health(&GroundingGuard::new()),
        generator_health(generator, probe).await,
    ];
    let status = components
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Healthy);

    HealthReport {
        status,
        components,
        checked_at: Utc::now(),
    }
}

fn reference_health(source: &dyn ReferenceSource) -> ComponentHealth {
    let mut available = Vec::new();
    let mut missing = Vec::new();

    for city in City::ALL {
        match source.fetch(city) {
            Ok(Some(doc)) if !doc.text.trim().is_empty() => available.push(city.id()),
            Ok(_) => missing.push(format!("{} ({})", city.id(), source.locator(city))),
            Err(e) => {
                return ComponentHealth {
                    component: "reference_source",
                    status: HealthStatus::Error,
                    detail: e.to_string(),
                }
            }
        }
    }

    let status = match (available.is_empty(), missing.is_empty()) {
        (true, _) => HealthStatus::Error,
        (false, false) => HealthStatus::Warning,
        (false, true) => HealthStatus::Healthy,
    };
    let mut detail = format!("available: [{}]", available.join(", "));
    if !missing.is_empty() {
        detail.push_str(&format!("; missing or empty: [{}]", missing.join(", ")));
    }

    ComponentHealth {
        component: "reference_source",
        status,
        detail,
    }
}

fn scope_gate_health(gate: &ScopeGate) -> ComponentHealth {
    let topics = gate.topics();
    ComponentHealth {
        component: "scope_gate",
        status: if topics.is_empty() {
            HealthStatus::Error
        } else {
            HealthStatus::Healthy
        },
        detail: format!("{} topics registered", topics.len()),
    }
}

fn guard_health(guard: &GroundingGuard) -> ComponentHealth {
    let refusals = guard.refusals();
    ComponentHealth {
        component: "grounding_guard",
        status: if refusals.is_empty() {
            HealthStatus::Error
        } else {
            HealthStatus::Healthy
        },
        detail: format!("{} canonical refusals registered", refusals.len()),
    }
}

async fn generator_health(generator: &dyn Generator, probe: bool) -> ComponentHealth {
    let model = generator.model_id();
    if !probe {
        return ComponentHealth {
            component: "generator",
            status: HealthStatus::Healthy,
            detail: format!("model {model} (not probed)"),
        };
    }

    match generator.probe().await {
        Ok(()) => ComponentHealth {
            component: "generator",
            status: HealthStatus::Healthy,
            detail: format!("model {model} responded"),
        },
        Err(e) => {
            tracing::warn!("Generator probe failed: {e}");
            ComponentHealth {
                component: "generator",
                status: HealthStatus::Error,
                detail: format!("model {model} probe failed: {e}"),
            }
        }
    }
}
