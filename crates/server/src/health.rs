use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    http: reqwest::Client,
    llm_base_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub model_endpoint: HealthCheck,
    pub checked_at: String,
}

pub fn router(http: reqwest::Client, llm_base_url: String) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState {
        http,
        llm_base_url: llm_base_url.trim_end_matches('/').to_string(),
    })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let model_endpoint = model_endpoint_check(&state).await;
    let ready = model_endpoint.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "concierge-server runtime initialized".to_string(),
        },
        model_endpoint,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn model_endpoint_check(state: &HealthState) -> HealthCheck {
    let url = format!("{}/api/tags", state.llm_base_url);
    match state.http.get(&url).send().await.and_then(|response| response.error_for_status()) {
        Ok(_) => HealthCheck {
            status: "ready",
            detail: "model endpoint responded".to_string(),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("model endpoint check failed: {error}"),
        },
    }
}
