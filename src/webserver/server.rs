/// Axum webserver implementation
///
/// Server lifecycle: bind, serve, graceful shutdown via a global notifier.
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;

use crate::logger::{self, LogTag};
use crate::webserver::{routes, state::AppState};

/// Global shutdown notifier.
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver. Blocks until the server is shut down.
pub async fn start_server(state: Arc<AppState>) -> Result<(), String> {
    let host = state.config.webserver.host.clone();
    let port = state.config.webserver.port;

    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| format!("Invalid bind address {}:{}: {}", host, port, e))?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AddrInUse => format!(
                "Failed to bind to {}: address already in use. \
                 Another lorascope instance is probably running.",
                addr
            ),
            _ => format!("Failed to bind to {}: {}", addr, e),
        })?;

    logger::info(
        LogTag::Webserver,
        &format!("Webserver listening on http://{}", addr),
    );
    logger::info(
        LogTag::Webserver,
        &format!("Realtime feed available at ws://{}/ws", addr),
    );

    let shutdown_signal = async {
        SHUTDOWN_NOTIFY.notified().await;
        logger::info(LogTag::Webserver, "Shutdown signal received, stopping webserver");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    logger::info(LogTag::Webserver, "Webserver stopped");

    Ok(())
}

/// Trigger webserver shutdown.
pub fn shutdown() {
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the axum application with routes and middleware.
fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state).layer(CorsLayer::permissive())
}
