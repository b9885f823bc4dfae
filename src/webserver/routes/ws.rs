/// WebSocket upgrade route
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::webserver::{state::AppState, ws::connection};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| connection::handle_session(socket, hub))
}
