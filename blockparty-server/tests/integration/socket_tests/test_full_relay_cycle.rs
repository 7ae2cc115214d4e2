use std::time::Duration;

use blockparty_core::{
    GameState, JoinData, PlayerId, RoomId, SessionDescription, SignalingMessage,
};

use crate::integration::init_tracing;
use crate::utils::{TestServer, WsTestClient};

fn join(player: &str, room: &str) -> SignalingMessage {
    SignalingMessage::JoinRoom {
        from: PlayerId::from(player),
        room_id: RoomId::from(room),
        data: JoinData {
            player_name: player.to_uppercase(),
        },
    }
}

fn roster_is(expected: &'static [&'static str]) -> impl Fn(&SignalingMessage) -> bool {
    move |m| match m {
        SignalingMessage::PlayerList { data, .. } => data
            .players
            .iter()
            .map(|p| p.player_id.as_str())
            .eq(expected.iter().copied()),
        _ => false,
    }
}

#[tokio::test]
async fn test_full_relay_cycle() {
    init_tracing();

    let server = TestServer::start().await.expect("server start");
    let mut a = WsTestClient::connect(&server.ws_url()).await.expect("a connects");
    let mut b = WsTestClient::connect(&server.ws_url()).await.expect("b connects");

    a.send(&join("a", "R1")).await.unwrap();
    a.wait_for(roster_is(&["a"])).await.expect("a sees itself");

    b.send(&join("b", "R1")).await.unwrap();
    a.wait_for(roster_is(&["a", "b"])).await.expect("a sees b");
    b.wait_for(roster_is(&["a", "b"])).await.expect("b sees both");

    b.send(&SignalingMessage::Offer {
        from: PlayerId::from("b"),
        to: PlayerId::from("a"),
        room_id: RoomId::from("R1"),
        data: SessionDescription::offer("v=0"),
    })
    .await
    .unwrap();
    let offer = a
        .wait_for(|m| m.kind() == "offer")
        .await
        .expect("a gets the offer");
    assert_eq!(offer.sender(), Some(&PlayerId::from("b")));

    let mut state = GameState::idle(PlayerId::from("a"), "A");
    state.score = 40;
    state.timestamp = 1;
    a.send(&SignalingMessage::GameState {
        from: PlayerId::from("a"),
        room_id: RoomId::from("R1"),
        data: state,
    })
    .await
    .unwrap();
    b.wait_for(|m| matches!(m, SignalingMessage::GameState { data, .. } if data.score == 40))
        .await
        .expect("b gets a's state");
    b.expect_none(200, |m| m.kind() == "offer")
        .await
        .expect("b never sees its own offer");

    a.close().await.unwrap();
    b.wait_for(roster_is(&["b"])).await.expect("b sees a leave");
    b.close().await.unwrap();

    let mut emptied = false;
    for _ in 0..50 {
        if server.relay.rooms().await.unwrap().is_empty() {
            emptied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(emptied, "R1 should be gone once both sockets closed");
}

#[tokio::test]
async fn test_garbage_frame_keeps_socket_open() {
    init_tracing();

    let server = TestServer::start().await.expect("server start");
    let mut a = WsTestClient::connect(&server.ws_url()).await.expect("a connects");

    a.send_raw("definitely not json").await.unwrap();
    a.send(&join("a", "R5")).await.unwrap();
    a.wait_for(roster_is(&["a"]))
        .await
        .expect("socket survived the bad frame");
}

#[tokio::test]
async fn test_health_endpoint() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let server = TestServer::start().await.expect("server start");
    let mut tcp = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    tcp.write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    tcp.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got {response}");
    assert!(response.ends_with("ok"));
}
