/// WebSocket connection handler
///
/// One task per viewer connection:
/// - Registers with the hub and greets the client with a `connected` frame
/// - Forwards broadcast frames from the hub queue to the socket
/// - Accepts and ignores inbound client messages
/// - Unregisters on close, socket error, or hub-side prune
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::arguments::is_debug_webserver_enabled;
use crate::logger::{self, LogTag};

use super::hub::WsHub;

/// Greeting frame sent once per connection, before any broadcast data.
const CONNECTED_FRAME: &str =
    "{\"type\":\"connected\",\"message\":\"WebSocket connection established\"}";

/// Handle a viewer WebSocket connection until it closes.
pub async fn handle_session(socket: WebSocket, hub: Arc<WsHub>) {
    let (session_id, mut hub_rx) = hub.register_session().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    if ws_tx.send(Message::Text(CONNECTED_FRAME.to_string())).await.is_err() {
        hub.unregister_session(session_id).await;
        return;
    }

    logger::info(
        LogTag::Webserver,
        &format!("Viewer session {} connected", session_id),
    );

    loop {
        tokio::select! {
            biased;

            // Frames from the hub (broadcast path).
            frame = hub_rx.recv() => {
                match frame {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(Message::Text(text)).await {
                            logger::warning(
                                LogTag::Webserver,
                                &format!("Session {}: send failed: {}", session_id, e),
                            );
                            break;
                        }
                    }
                    // Sender dropped: the hub pruned this session.
                    None => break,
                }
            }

            // Messages from the client.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Inbound client messages are accepted but not
                        // processed.
                        if is_debug_webserver_enabled() {
                            logger::debug(
                                LogTag::Webserver,
                                &format!("Session {}: inbound message ignored: {}", session_id, text),
                            );
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Keepalive; axum answers pings automatically.
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        if is_debug_webserver_enabled() {
                            logger::debug(
                                LogTag::Webserver,
                                &format!("Session {}: client closed", session_id),
                            );
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        logger::warning(
                            LogTag::Webserver,
                            &format!("Session {}: websocket error: {}", session_id, e),
                        );
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    hub.unregister_session(session_id).await;
    logger::info(
        LogTag::Webserver,
        &format!("Viewer session {} disconnected", session_id),
    );
}
