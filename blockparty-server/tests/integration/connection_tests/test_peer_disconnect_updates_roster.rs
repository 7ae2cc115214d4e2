use blockparty_core::RoomId;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{TestPeer, players};

#[tokio::test]
async fn test_peer_disconnect_updates_roster() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    a.join().await;
    b.join().await;

    a.disconnect().await;
    let rooms = relay.rooms().await.expect("relay stopped");

    assert_eq!(
        signaling.last_roster_for(b.connection).await,
        Some(players(&["b"]))
    );
    assert!(rooms.contains_key(&RoomId::from("R1")), "room still has B");

    // a second disconnect for the same socket changes nothing
    signaling.clear().await;
    a.disconnect().await;
    relay.rooms().await.expect("relay stopped");
    assert!(signaling.messages_for(b.connection).await.is_empty());
}

#[tokio::test]
async fn test_explicit_leave_matches_disconnect() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    let c = TestPeer::new(&relay, "c", "R1");
    a.join().await;
    b.join().await;
    c.join().await;

    b.leave().await;
    c.disconnect().await;
    let rooms = relay.rooms().await.expect("relay stopped");

    assert_eq!(
        signaling.last_roster_for(a.connection).await,
        Some(players(&["a"]))
    );
    let ids: Vec<_> = rooms[&RoomId::from("R1")]
        .iter()
        .map(|p| p.player_id.clone())
        .collect();
    assert_eq!(ids, players(&["a"]));
}
