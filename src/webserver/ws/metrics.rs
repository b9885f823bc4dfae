/// WebSocket hub metrics
///
/// Aggregate counters across all sessions. `frames_serialized` makes the
/// broadcast short-circuit observable: a publish with no sessions must not
/// serialize at all.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Lifetime session count.
    total_sessions: AtomicU64,

    /// Record serializations performed by broadcasts.
    frames_serialized: AtomicU64,

    /// Frames enqueued to a session.
    frames_sent: AtomicU64,

    /// Frames that could not be enqueued (queue full or closed).
    frames_dropped: AtomicU64,

    /// Sessions removed because a send failed.
    sessions_pruned: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session_opened(&self) {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_serialized(&self) {
        self.frames_serialized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_pruned(&self) {
        self.sessions_pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            frames_serialized: self.frames_serialized.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            sessions_pruned: self.sessions_pruned.load(Ordering::Relaxed),
        }
    }
}

/// Serializable counter snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_sessions: u64,
    pub frames_serialized: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub sessions_pruned: u64,
}
