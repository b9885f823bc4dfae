/// Health endpoint
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::webserver::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: String,
    uptime_seconds: u64,
    active_sessions: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        service: "lorascope",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.uptime_seconds(),
        active_sessions: state.hub.session_count().await,
    })
}
