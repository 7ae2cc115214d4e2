use blockparty_client::SessionHandlers;
use blockparty_core::{GameState, PlayerId};
use tokio::sync::watch;

use crate::integration::init_tracing;
use crate::utils::{RawPeer, RelayHarness, is_state, state_of};

#[tokio::test]
async fn test_broadcast_runs_until_stopped() {
    init_tracing();
    let harness = RelayHarness::start().await.unwrap();

    let mut b = RawPeer::join(&harness.url(), "b", "R1").await.unwrap();
    let a = harness
        .session("a", "R1", SessionHandlers::default())
        .await
        .unwrap();

    let (local_tx, local_rx) = watch::channel(GameState::idle(PlayerId::from("a"), "A"));
    let guard = a.start_broadcast(local_rx);
    assert!(guard.is_running());

    let waiting = b.collect(450, is_state).await.unwrap();
    assert!(
        waiting.len() >= 3,
        "idle state is broadcast too, got {}",
        waiting.len()
    );

    local_tx.send_modify(|state| state.score = 120);
    let updated = b
        .next_matching(|m| state_of(m).is_some_and(|s| s.score == 120))
        .await
        .expect("latest local state is picked up");

    let mut stamps: Vec<u64> = waiting
        .iter()
        .filter_map(state_of)
        .map(|s| s.timestamp)
        .collect();
    stamps.extend(state_of(&updated).map(|s| s.timestamp));
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "timestamps never go back");

    guard.stop();
    // Anything already in flight drains first.
    b.collect(150, is_state).await.unwrap();
    let after = b.collect(400, is_state).await.unwrap();
    assert!(after.is_empty(), "no ticks after stop");

    a.disconnect().await;
}

#[tokio::test]
async fn test_dropping_guard_stops_broadcast() {
    init_tracing();
    let harness = RelayHarness::start().await.unwrap();

    let mut b = RawPeer::join(&harness.url(), "b", "R2").await.unwrap();
    let a = harness
        .session("a", "R2", SessionHandlers::default())
        .await
        .unwrap();

    let (_local_tx, local_rx) = watch::channel(GameState::idle(PlayerId::from("a"), "A"));
    {
        let _guard = a.start_broadcast(local_rx);
        b.next_matching(is_state).await.expect("at least one tick");
    }

    b.collect(150, is_state).await.unwrap();
    assert!(b.collect(400, is_state).await.unwrap().is_empty());

    a.disconnect().await;
}
