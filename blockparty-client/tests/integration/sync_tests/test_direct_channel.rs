use blockparty_client::{Session, SessionHandlers};
use blockparty_core::sync::PeerView;
use blockparty_core::{GameState, PlayerId, RoomId, SessionDescription, SignalingMessage};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::integration::init_tracing;
use crate::utils::{RawPeer, RelayHarness, wait_until};

fn collecting_handlers() -> (SessionHandlers, mpsc::UnboundedReceiver<PeerView>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handlers = SessionHandlers::default().on_peer_state(move |view| {
        let _ = tx.send(view.clone());
    });
    (handlers, rx)
}

/// Views with `score` that arrive within `window`.
async fn count_score(
    rx: &mut mpsc::UnboundedReceiver<PeerView>,
    score: u64,
    window: Duration,
) -> usize {
    let deadline = tokio::time::Instant::now() + window;
    let mut count = 0;
    while let Ok(Some(view)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if view.score == score {
            count += 1;
        }
    }
    count
}

async fn connected_pair(
    harness: &RelayHarness,
    room: &str,
) -> (Session, Session, mpsc::UnboundedReceiver<PeerView>) {
    let a = harness
        .session("a", room, SessionHandlers::default())
        .await
        .unwrap();
    let (handlers, rx) = collecting_handlers();
    let b = harness.session("b", room, handlers).await.unwrap();

    let opened = wait_until(Duration::from_secs(10), || {
        a.direct_peers() == [PlayerId::from("b")] && b.direct_peers() == [PlayerId::from("a")]
    })
    .await;
    assert!(opened, "the joiner's offer should end in an open channel on both sides");

    (a, b, rx)
}

#[tokio::test]
async fn test_joiner_negotiates_direct_channel() {
    init_tracing();
    let harness = RelayHarness::start().await.unwrap();
    let (a, b, mut rx) = connected_pair(&harness, "D1").await;

    let mut state = GameState::idle(PlayerId::from("a"), "A");
    state.score = 4242;
    a.send_state(state).unwrap();

    // Same stamp on both paths, so the second copy is re-applied, not dropped.
    let deliveries = count_score(&mut rx, 4242, Duration::from_secs(1)).await;
    assert_eq!(deliveries, 2, "one send arrives over the relay and the channel");

    b.disconnect().await;
    let closed = wait_until(Duration::from_secs(5), || a.direct_peers().is_empty()).await;
    assert!(closed, "b leaving tears down a's link");

    a.disconnect().await;
}

#[tokio::test]
async fn test_direct_channel_outlives_relay() {
    init_tracing();
    let harness = RelayHarness::start().await.unwrap();
    let (a, b, mut rx) = connected_pair(&harness, "D2").await;

    // With the relay loop gone the next inbound frame closes each socket.
    harness.relay.shutdown();
    let (_a_tx, a_rx) = watch::channel(GameState::idle(PlayerId::from("a"), "A"));
    let (_b_tx, b_rx) = watch::channel(GameState::idle(PlayerId::from("b"), "B"));
    let a_ticks = a.start_broadcast(a_rx);
    let b_ticks = b.start_broadcast(b_rx);

    let lost = wait_until(Duration::from_secs(5), || {
        !a.relay_connected() && !b.relay_connected()
    })
    .await;
    assert!(lost, "both sessions notice the relay is gone");
    a_ticks.stop();
    b_ticks.stop();
    while rx.try_recv().is_ok() {}

    let mut state = GameState::idle(PlayerId::from("a"), "A");
    state.score = 99;
    a.send_state(state).unwrap();

    let deliveries = count_score(&mut rx, 99, Duration::from_secs(1)).await;
    assert_eq!(deliveries, 1, "only the direct channel is left");
    assert!(!a.is_closed());
    assert!(!b.is_closed());
    assert_eq!(a.direct_peers(), vec![PlayerId::from("b")]);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_stray_answer_keeps_open_channel() {
    init_tracing();
    let harness = RelayHarness::start().await.unwrap();
    let (a, b, mut rx) = connected_pair(&harness, "D3").await;

    // The relay does not check senders, so anyone can claim to be b.
    let mut c = RawPeer::join(&harness.url(), "c", "D3").await.unwrap();
    c.send(&SignalingMessage::Answer {
        from: PlayerId::from("b"),
        to: PlayerId::from("a"),
        room_id: RoomId::from("D3"),
        data: SessionDescription::answer("v=0"),
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(a.direct_peers(), vec![PlayerId::from("b")]);

    let mut state = GameState::idle(PlayerId::from("a"), "A");
    state.score = 17;
    a.send_state(state).unwrap();
    let deliveries = count_score(&mut rx, 17, Duration::from_secs(1)).await;
    assert_eq!(deliveries, 2);

    a.disconnect().await;
    b.disconnect().await;
}
