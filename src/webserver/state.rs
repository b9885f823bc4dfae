/// Shared application state for the webserver
///
/// References to the core systems that route handlers need.
use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::stats::StatisticsEngine;
use crate::webserver::ws::WsHub;

/// Shared state passed to all route handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Arc<Config>,

    /// Message store handle.
    pub db: Arc<Database>,

    /// Central WebSocket hub.
    pub hub: Arc<WsHub>,

    /// Statistics engine over the store.
    pub stats: StatisticsEngine,

    /// Server startup time.
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: Arc<Database>, hub: Arc<WsHub>) -> Self {
        let stats = StatisticsEngine::new(db.clone(), &config.statistics);
        Self {
            config,
            db,
            hub,
            stats,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
