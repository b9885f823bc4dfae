/// Realtime WebSocket subsystem
///
/// `hub` holds the session registry and broadcast fan-out; `connection`
/// drives one socket per viewer; `metrics` exposes hub counters.
pub mod connection;
pub mod hub;
pub mod metrics;

pub use hub::{SessionId, WsHub};
