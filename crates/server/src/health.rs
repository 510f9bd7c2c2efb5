use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use shopchat_agent::ChatRuntime;

#[derive(Clone)]
pub struct HealthState {
    runtime: Arc<ChatRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(runtime: Arc<ChatRuntime>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { runtime })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let model = model_check(&state.runtime);
    let catalog = catalog_check(&state.runtime);
    let ready = model.status == "ready";

    let payload = HealthResponse {
        status: if ready && catalog.status != "degraded" {
            "ready"
        } else if ready {
            "degraded"
        } else {
            "not_ready"
        },
        model,
        catalog,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn model_check(runtime: &ChatRuntime) -> HealthCheck {
    if runtime.is_model_loaded() {
        HealthCheck { status: "ready", detail: "language model client configured".to_string() }
    } else {
        HealthCheck {
            status: "not_loaded",
            detail: "no api key configured for the language model provider".to_string(),
        }
    }
}

fn catalog_check(runtime: &ChatRuntime) -> HealthCheck {
    let Some(provider) = runtime.catalog() else {
        return HealthCheck { status: "disabled", detail: "product catalog disabled".to_string() };
    };

    match provider.last_loaded() {
        Some(snapshot) if snapshot.is_healthy() => HealthCheck {
            status: "ready",
            detail: format!("{} products from {}", snapshot.row_count, provider.describe_source()),
        },
        Some(snapshot) => HealthCheck {
            status: "degraded",
            detail: snapshot.error.unwrap_or_else(|| "catalog unreadable".to_string()),
        },
        None => HealthCheck {
            status: "degraded",
            detail: format!("catalog not loaded yet from {}", provider.describe_source()),
        },
    }
}
