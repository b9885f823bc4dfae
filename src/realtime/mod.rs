/// Realtime push path
///
/// The poller discovers new uplink records on a fixed tick and hands them
/// to the WebSocket hub for fan-out.
pub mod poller;

pub use poller::RealtimePoller;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::Config;
use crate::database::Database;
use crate::webserver::ws::WsHub;

/// Spawn the background polling loop. Returns the shutdown handle; sending
/// `true` stops the loop cleanly without re-dispatching a fetched batch.
pub fn start(db: Arc<Database>, hub: Arc<WsHub>, config: &Config) -> watch::Sender<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = RealtimePoller::new(db, hub, config.statistics.utc_offset_hours);
    let poll_interval = Duration::from_secs(config.realtime.poll_interval_secs);
    let status_interval = Duration::from_secs(config.realtime.status_interval_secs);

    tokio::spawn(poller.run(poll_interval, status_interval, shutdown_rx));

    shutdown_tx
}
