/// WebSocket session hub - registry and broadcaster
///
/// The hub owns the set of live viewer sessions and fans newly discovered
/// uplink records out to them:
/// - Per-session bounded queues decouple slow sockets from the poller and
///   from each other; each session's connection task drains its own queue,
///   so per-session FIFO order is preserved.
/// - A record is serialized to its wire frame exactly once per broadcast;
///   an empty registry short-circuits before any serialization happens.
/// - A session whose queue is closed or full is pruned mid-broadcast and
///   delivery continues to the rest. A full queue is the timed-out-write
///   case and is treated identically to a failed write.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::arguments::is_debug_webserver_enabled;
use crate::logger::{self, LogTag};
use crate::types::UplinkRecord;

use super::metrics::HubMetrics;

/// Session ID, unique per WebSocket connection.
pub type SessionId = u64;

/// Per-session sender (bounded channel of serialized frames).
pub type SessionSender = mpsc::Sender<String>;

/// Central WebSocket hub.
pub struct WsHub {
    /// Active sessions (session_id → frame sender).
    sessions: RwLock<HashMap<SessionId, SessionSender>>,

    /// Next session ID.
    next_session_id: AtomicU64,

    /// Hub metrics.
    metrics: Arc<HubMetrics>,

    /// Per-session queue capacity.
    buffer_size: usize,
}

impl WsHub {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            metrics: HubMetrics::new(),
            buffer_size,
        })
    }

    /// Register a new session; the returned receiver is drained by the
    /// session's connection task.
    pub async fn register_session(&self) -> (SessionId, mpsc::Receiver<String>) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        self.sessions.write().await.insert(session_id, tx);
        self.metrics.session_opened();

        if is_debug_webserver_enabled() {
            logger::debug(
                LogTag::Webserver,
                &format!(
                    "Session {} registered (active={})",
                    session_id,
                    self.sessions.read().await.len()
                ),
            );
        }

        (session_id, rx)
    }

    /// Remove a session. Removing an already-removed session is a no-op.
    pub async fn unregister_session(&self, session_id: SessionId) {
        self.sessions.write().await.remove(&session_id);

        if is_debug_webserver_enabled() {
            logger::debug(
                LogTag::Webserver,
                &format!(
                    "Session {} unregistered (active={})",
                    session_id,
                    self.sessions.read().await.len()
                ),
            );
        }
    }

    /// Active session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Broadcast one uplink record to every session. Returns the number of
    /// sessions the frame was enqueued to.
    pub async fn broadcast_uplink(&self, record: &UplinkRecord) -> usize {
        if self.sessions.read().await.is_empty() {
            return 0;
        }

        // One serialization per publish, shared by all sessions.
        let frame = match serde_json::to_string(record) {
            Ok(frame) => frame,
            Err(e) => {
                logger::error(
                    LogTag::Webserver,
                    &format!("Failed to serialize uplink record {}: {}", record.id, e),
                );
                return 0;
            }
        };
        self.metrics.frame_serialized();

        let mut delivered = 0;
        let mut stale: Vec<SessionId> = Vec::new();

        {
            let sessions = self.sessions.read().await;
            for (session_id, sender) in sessions.iter() {
                match sender.try_send(frame.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        self.metrics.frame_sent();
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Session cannot keep up; equivalent to a write
                        // timeout, so it is dropped like a failed write.
                        stale.push(*session_id);
                        self.metrics.frame_dropped();
                        logger::warning(
                            LogTag::Webserver,
                            &format!("Session {} queue full, dropping session", session_id),
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        stale.push(*session_id);
                        self.metrics.frame_dropped();
                    }
                }
            }
        }

        if !stale.is_empty() {
            let mut sessions = self.sessions.write().await;
            for session_id in stale {
                if sessions.remove(&session_id).is_some() {
                    self.metrics.session_pruned();
                    if is_debug_webserver_enabled() {
                        logger::debug(
                            LogTag::Webserver,
                            &format!("Session {} pruned during broadcast", session_id),
                        );
                    }
                }
            }
        }

        delivered
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device: &str) -> UplinkRecord {
        UplinkRecord {
            id: 7,
            timestamp: "2025-08-01T10:00:00.000000".to_string(),
            application_id: "app-1".to_string(),
            device_id: device.to_string(),
            dev_eui: None,
            payload_base64: None,
            payload_hex: None,
            payload_text: None,
            payload_size: None,
            frame_count: None,
            f_port: None,
            frequency: None,
            data_rate: None,
            rssi: Some(-72.0),
            snr: Some(8.0),
            latitude: None,
            longitude: None,
            hostname: None,
            raw_topic: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn registration_lifecycle() {
        let hub = WsHub::new(8);

        let (id1, _rx1) = hub.register_session().await;
        let (id2, _rx2) = hub.register_session().await;
        assert_ne!(id1, id2);
        assert_eq!(hub.session_count().await, 2);

        hub.unregister_session(id1).await;
        assert_eq!(hub.session_count().await, 1);

        // Double-unregister is harmless.
        hub.unregister_session(id1).await;
        assert_eq!(hub.session_count().await, 1);
    }

    #[tokio::test]
    async fn broadcast_delivers_flat_record_frame() {
        let hub = WsHub::new(8);
        let (_id, mut rx) = hub.register_session().await;

        let delivered = hub.broadcast_uplink(&record("dev-a")).await;
        assert_eq!(delivered, 1);

        let frame = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        // Flat record object, no envelope.
        assert_eq!(value["deviceId"], "dev-a");
        assert_eq!(value["rssi"], -72.0);
        assert!(value.get("type").is_none());
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn broadcast_with_no_sessions_skips_serialization() {
        let hub = WsHub::new(8);

        let delivered = hub.broadcast_uplink(&record("dev-a")).await;
        assert_eq!(delivered, 0);

        let snapshot = hub.metrics().snapshot();
        assert_eq!(snapshot.frames_serialized, 0);
        assert_eq!(snapshot.frames_sent, 0);
    }

    #[tokio::test]
    async fn closed_session_is_pruned_and_others_still_receive() {
        let hub = WsHub::new(8);

        let (_id1, rx1) = hub.register_session().await;
        let (_id2, mut rx2) = hub.register_session().await;

        // Simulate a disconnected viewer: its receiver is gone.
        drop(rx1);

        let delivered = hub.broadcast_uplink(&record("dev-a")).await;
        assert_eq!(delivered, 1);
        assert_eq!(hub.session_count().await, 1);
        assert!(rx2.recv().await.is_some());
        assert_eq!(hub.metrics().snapshot().sessions_pruned, 1);
    }

    #[tokio::test]
    async fn slow_session_is_dropped_when_queue_fills() {
        let hub = WsHub::new(1);
        let (_id, mut rx) = hub.register_session().await;

        // First frame fills the queue; the second overflows it and the
        // session is removed without the call failing.
        assert_eq!(hub.broadcast_uplink(&record("dev-a")).await, 1);
        assert_eq!(hub.broadcast_uplink(&record("dev-b")).await, 0);
        assert_eq!(hub.session_count().await, 0);

        // The frame that was queued before removal is still readable, and
        // nothing arrives after it.
        let first = rx.recv().await.unwrap();
        assert!(first.contains("dev-a"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn per_session_order_is_publish_order() {
        let hub = WsHub::new(8);
        let (_id, mut rx) = hub.register_session().await;

        for device in ["dev-1", "dev-2", "dev-3"] {
            hub.broadcast_uplink(&record(device)).await;
        }

        for expected in ["dev-1", "dev-2", "dev-3"] {
            let frame = rx.recv().await.unwrap();
            assert!(frame.contains(expected));
        }
    }
}
