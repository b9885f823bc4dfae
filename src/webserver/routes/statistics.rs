/// Statistics endpoint
///
/// Serves one fresh aggregate snapshot per request. A failed computation
/// returns an error response, never a partially-filled snapshot.
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::logger::{self, LogTag};
use crate::webserver::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/statistics", get(get_statistics))
}

async fn get_statistics(State(state): State<Arc<AppState>>) -> Response {
    match state.stats.snapshot_now() {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            logger::error(
                LogTag::Stats,
                &format!("Statistics computation failed: {}", e),
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "statistics computation failed"
                })),
            )
                .into_response()
        }
    }
}
