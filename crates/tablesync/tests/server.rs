//! End-to-end tests over real websockets.
//!
//! Each test binds a server on an ephemeral port, connects clients with
//! `tokio-tungstenite`, and drives the full wire protocol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tablesync::{SyncContext, TableServer};
use tablesync_protocol::{ErrorCode, PlayerId, RoomId, RoomPhase, ServerEvent};
use tablesync_room::RoomConfig;
use tablesync_session::SessionConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =========================================================================
// Helpers
// =========================================================================

async fn spawn_server(
    session_config: SessionConfig,
) -> (std::net::SocketAddr, Arc<SyncContext>) {
    let server = TableServer::builder()
        .bind("127.0.0.1:0")
        .room_config(RoomConfig::default())
        .session_config(session_config)
        .build()
        .await
        .expect("bind on an ephemeral port");
    let addr = server.local_addr().expect("bound address");
    let ctx = server.context();
    ctx.rooms
        .lock()
        .await
        .create_room(Some(RoomId::new("duel")), Some(2), HashMap::new())
        .expect("seed room");
    tokio::spawn(server.run());
    (addr, ctx)
}

async fn connect(addr: std::net::SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("websocket handshake");
    ws
}

async fn send_json(ws: &mut Client, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("send");
}

/// Next decoded server event; `None` once the server closes the socket.
async fn recv_event(ws: &mut Client) -> Option<ServerEvent> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("an event should arrive in time")?;
        match frame.expect("frame") {
            Message::Text(text) => {
                return Some(
                    serde_json::from_str(text.as_str()).expect("decodable"),
                );
            }
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

async fn recv_matching(
    ws: &mut Client,
    want: impl Fn(&ServerEvent) -> bool,
) -> ServerEvent {
    for _ in 0..30 {
        let event = recv_event(ws).await.expect("socket should stay open");
        if want(&event) {
            return event;
        }
    }
    panic!("no matching event within 30 frames");
}

fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

// =========================================================================
// Full two-player scenario
// =========================================================================

#[tokio::test]
async fn test_two_player_hand_over_websockets() {
    let (addr, ctx) = spawn_server(SessionConfig::default()).await;

    // Hero connects and gets the pre-join snapshot of the empty room.
    let mut hero = connect(addr, "/ws/duel").await;
    match recv_event(&mut hero).await.unwrap() {
        ServerEvent::RoomState {
            room_id,
            phase,
            players,
            ..
        } => {
            assert_eq!(room_id, RoomId::new("duel"));
            assert_eq!(phase, RoomPhase::Waiting);
            assert!(players.is_empty());
        }
        other => panic!("expected snapshot, got {other:?}"),
    }

    send_json(
        &mut hero,
        r#"{"event":"join_room","payload":{"playerId":"hero","displayName":"Hero"}}"#,
    )
    .await;
    recv_matching(&mut hero, |e| {
        matches!(e, ServerEvent::RoomState { players, .. } if players == &[pid("hero")])
    })
    .await;

    // Villain joins; the table fills and a hand starts automatically.
    let mut villain = connect(addr, "/ws/duel").await;
    send_json(
        &mut villain,
        r#"{"event":"join_room","payload":{"playerId":"villain","displayName":"Villain"}}"#,
    )
    .await;

    let deal = recv_matching(&mut hero, |e| {
        matches!(e, ServerEvent::SecureDeal { .. })
    })
    .await;
    let ServerEvent::SecureDeal { hand_id, cards } = deal else {
        unreachable!();
    };
    assert_eq!(cards.len(), 2);
    // Tokens are opaque: base64 fields, no card text on the wire.
    assert!(!cards[0].card_token.ciphertext.is_empty());
    recv_matching(&mut villain, |e| {
        matches!(
            e,
            ServerEvent::UpdatedState {
                phase: RoomPhase::Playing,
                ..
            }
        )
    })
    .await;

    // Hero concedes; villain takes the (empty) pot.
    send_json(
        &mut hero,
        r#"{"event":"action","payload":{"playerId":"hero","type":"fold"}}"#,
    )
    .await;
    let showdown = recv_matching(&mut villain, |e| {
        matches!(e, ServerEvent::Showdown { .. })
    })
    .await;
    let ServerEvent::Showdown { winner, .. } = showdown else {
        unreachable!();
    };
    assert_eq!(winner, Some(pid("villain")));

    // A fresh hand is dealt without either client rejoining.
    let next_deal = recv_matching(&mut hero, |e| {
        matches!(e, ServerEvent::SecureDeal { .. })
    })
    .await;
    let ServerEvent::SecureDeal {
        hand_id: next_hand, ..
    } = next_deal
    else {
        unreachable!();
    };
    assert_ne!(next_hand, hand_id, "each hand gets a fresh id");

    // Settlement reached the rating store.
    let ratings = ctx.ratings.lock().await;
    assert_eq!(ratings.rating_of(&pid("villain")).global, 1502);
    assert_eq!(ratings.rating_of(&pid("hero")).global, 1499);
    drop(ratings);
    assert_eq!(ctx.history.lock().await.total_hands(), 1);
}

#[tokio::test]
async fn test_unroutable_path_gets_error_then_close() {
    let (addr, _ctx) = spawn_server(SessionConfig::default()).await;

    let mut ws = connect(addr, "/nope").await;
    match recv_event(&mut ws).await {
        Some(ServerEvent::Error {
            code, recoverable, ..
        }) => {
            assert_eq!(code, ErrorCode::RoomMissing);
            assert!(!recoverable);
        }
        other => panic!("expected room_missing, got {other:?}"),
    }
    assert!(
        recv_event(&mut ws).await.is_none(),
        "server should close after the error"
    );
}

// =========================================================================
// Liveness watchdog
// =========================================================================

fn fast_watchdog() -> SessionConfig {
    SessionConfig {
        probe_interval: Duration::from_millis(50),
        liveness_timeout: Duration::from_millis(200),
    }
}

#[tokio::test]
async fn test_silent_client_is_timed_out_and_closed() {
    let (addr, ctx) = spawn_server(fast_watchdog()).await;

    let mut ws = connect(addr, "/ws/duel").await;
    // Say nothing. Heartbeat probes arrive, then one timeout, then close.
    let mut timeouts = 0;
    while let Some(event) = recv_event(&mut ws).await {
        match event {
            ServerEvent::Heartbeat { .. } | ServerEvent::RoomState { .. } => {}
            ServerEvent::Error { code, .. } => {
                assert_eq!(code, ErrorCode::Timeout);
                timeouts += 1;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(timeouts, 1, "exactly one timeout notice before the close");

    // The server side cleaned the session up.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ctx.sessions.lock().await.is_empty());
}

#[tokio::test]
async fn test_heartbeating_client_is_never_disconnected() {
    let (addr, _ctx) = spawn_server(fast_watchdog()).await;

    let mut ws = connect(addr, "/ws/duel").await;
    // Heartbeat well inside the liveness window, for several windows.
    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(80)).await;
        send_json(&mut ws, r#"{"event":"heartbeat","payload":{}}"#).await;
        // Drain whatever arrived; none of it may be an error or a close.
        loop {
            match tokio::time::timeout(Duration::from_millis(10), ws.next())
                .await
            {
                Err(_) => break,
                Ok(frame) => {
                    let msg = frame.expect("open").expect("frame");
                    match msg {
                        Message::Text(text) => {
                            let event: ServerEvent =
                                serde_json::from_str(text.as_str()).unwrap();
                            assert!(
                                !matches!(event, ServerEvent::Error { .. }),
                                "live client must not see errors: {event:?}"
                            );
                        }
                        Message::Close(_) => {
                            panic!("live client must not be closed")
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
