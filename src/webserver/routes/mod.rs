use axum::Router;
use std::sync::Arc;

use crate::webserver::state::AppState;

pub mod statistics;
pub mod status;
pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ws::routes())
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(statistics::routes())
}
