/// Service orchestration
///
/// Wires configuration, store, hub, poller and webserver together, and
/// installs the Ctrl-C shutdown path.
use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{
    arguments,
    config::Config,
    database::Database,
    logger::{self, LogTag},
    realtime,
    webserver::{self, state::AppState, ws::WsHub},
};

pub async fn run() -> Result<()> {
    let config_path = arguments::config_path();
    let config = Arc::new(Config::load(&config_path)?);
    logger::info(
        LogTag::Config,
        &format!("Configuration loaded from {}", config_path),
    );

    let db = Arc::new(Database::open(&config.database.path).with_context(|| {
        format!("failed to open message store at {}", config.database.path)
    })?);

    let hub = WsHub::new(config.webserver.ws_buffer_size);

    let poller_shutdown = realtime::start(db.clone(), hub.clone(), &config);

    ctrlc::set_handler(move || {
        logger::info(LogTag::System, "Shutdown signal received");
        let _ = poller_shutdown.send(true);
        webserver::server::shutdown();
    })
    .context("failed to install shutdown handler")?;

    let state = Arc::new(AppState::new(config, db, hub));
    webserver::server::start_server(state)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    logger::info(LogTag::System, "lorascope stopped");
    Ok(())
}
