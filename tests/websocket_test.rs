// Integration test for the relay over a real WebSocket connection
// The server is bound in-process on an ephemeral port

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use rusty_relay::config::RelayLimits;
use rusty_relay::constants::WS_PATH;
use rusty_relay::core::{Relay, SharedRelay};
use rusty_relay::handlers::routes;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn start_server() -> (SocketAddr, SharedRelay) {
    let relay = Relay::shared(RelayLimits::default());
    let (addr, server) =
        warp::serve(routes(relay.clone(), WS_PATH)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, relay)
}

async fn next_event(ws: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("event is JSON");
        }
    }
}

async fn connect(addr: SocketAddr) -> (Client, String) {
    let (mut ws, _) = connect_async(format!("ws://{}/{}", addr, WS_PATH))
        .await
        .expect("Failed to connect");
    let hello = next_event(&mut ws).await;
    assert_eq!(hello["event"], "connected");
    let id = hello["data"]["socketId"].as_str().unwrap().to_string();
    (ws, id)
}

async fn emit(ws: &mut Client, event: &str, data: Value) {
    ws.send(Message::Text(json!({ "event": event, "data": data }).to_string()))
        .await
        .expect("Failed to send");
}

async fn wait_for_room_size(relay: &SharedRelay, room: &str, size: usize) {
    for _ in 0..100 {
        if relay.room_size(room).unwrap() == size {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("room {} never reached {} members", room, size);
}

#[tokio::test]
async fn test_signaling_exchange_over_websocket() {
    let (addr, relay) = start_server();

    let (mut alice, alice_id) = connect(addr).await;
    let (mut bob, bob_id) = connect(addr).await;
    assert_ne!(alice_id, bob_id);

    emit(&mut alice, "subscribe", json!({ "room": "call-1", "socketId": alice_id })).await;
    wait_for_room_size(&relay, "call-1", 1).await;

    emit(&mut bob, "subscribe", json!({ "room": "call-1", "socketId": bob_id })).await;
    let joined = next_event(&mut alice).await;
    assert_eq!(joined["event"], "new user");
    assert_eq!(joined["data"]["socketId"], bob_id.as_str());

    let description = json!({ "type": "offer", "sdp": "v=0\r\ns=-\r\n" });
    emit(
        &mut alice,
        "sdp",
        json!({ "to": bob_id, "sender": alice_id, "description": description }),
    )
    .await;
    let offer = next_event(&mut bob).await;
    assert_eq!(offer["event"], "sdp");
    assert_eq!(offer["data"]["description"], description);
    assert_eq!(offer["data"]["sender"], alice_id.as_str());

    emit(
        &mut bob,
        "ice candidates",
        json!({ "to": alice_id, "sender": bob_id, "candidate": null }),
    )
    .await;
    let candidate = next_event(&mut alice).await;
    assert_eq!(candidate["event"], "ice candidates");
    assert!(candidate["data"]["candidate"].is_null());

    bob.close(None).await.expect("Failed to close");
    let left = next_event(&mut alice).await;
    assert_eq!(left["event"], "userLeft");
    assert_eq!(left["data"]["socketId"], bob_id.as_str());

    wait_for_room_size(&relay, "call-1", 1).await;
    assert_eq!(relay.connection_count().unwrap(), 1);
}

#[tokio::test]
async fn test_rejected_chat_reports_error() {
    let (addr, _relay) = start_server();
    let (mut client, id) = connect(addr).await;

    emit(
        &mut client,
        "chat",
        json!({ "room": "lobby", "sender": id, "msg": "<script>alert(1)</script>" }),
    )
    .await;

    let error = next_event(&mut client).await;
    assert_eq!(error["event"], "error");
    assert!(error["data"]["message"].as_str().is_some());
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _relay) = start_server();

    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .expect("health request");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");

    let missing = reqwest::get(format!("http://{}/nope", addr))
        .await
        .expect("request");
    assert_eq!(missing.status().as_u16(), 404);
}
