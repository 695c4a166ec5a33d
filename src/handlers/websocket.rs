use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use std::convert::Infallible;
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};
use warp::{Filter, Rejection, Reply};

use crate::constants::HEALTH_PATH;
use crate::core::relay::SharedRelay;

/// WebSocket route under `ws_path` plus a plain-text `/health` probe
pub fn routes(
    relay: SharedRelay,
    ws_path: &str,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let ws_route = warp::path(ws_path.to_string())
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_relay(relay))
        .map(|ws: warp::ws::Ws, relay: SharedRelay| {
            debug!("New websocket upgrade request");
            ws.on_upgrade(move |socket| handle_ws_client(socket, relay))
        });

    let health_route = warp::path(HEALTH_PATH)
        .and(warp::path::end())
        .map(|| "OK");

    ws_route.or(health_route)
}

// Helper function to include relay state in request
fn with_relay(
    relay: SharedRelay,
) -> impl Filter<Extract = (SharedRelay,), Error = Infallible> + Clone {
    warp::any().map(move || relay.clone())
}

// Handle a WebSocket connection
pub async fn handle_ws_client(ws: WebSocket, relay: SharedRelay) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Spawn a task to forward messages from our channel to the WebSocket.
    // It ends once every send handle of this connection has been dropped.
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut session = match relay.connect(tx) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to register connection: {}", e);
            return;
        }
    };

    if !session.send_welcome() {
        warn!("Could not greet connection {}", session.id());
    }
    match relay.connection_count() {
        Ok(count) => info!("Current connections: {}", count),
        Err(e) => error!("Failed to read connection count: {}", e),
    }

    // Handle incoming messages
    let reason = loop {
        match ws_rx.next().await {
            Some(Ok(msg)) => {
                if msg.is_close() {
                    break "client closed connection".to_string();
                }
                // Only text frames carry events
                if let Ok(text) = msg.to_str() {
                    session.handle_text(text);
                }
            }
            Some(Err(e)) => {
                warn!("WebSocket error on {}: {}", session.id(), e);
                break format!("transport error: {}", e);
            }
            None => break "transport closed".to_string(),
        }
    };

    session.disconnect(&reason);
}
