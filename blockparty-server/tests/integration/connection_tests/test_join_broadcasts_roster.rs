use blockparty_core::RoomId;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{TestPeer, players};

#[tokio::test]
async fn test_join_broadcasts_roster() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");

    a.join().await;
    b.join().await;
    let rooms = relay.rooms().await.expect("relay stopped");

    // A saw itself alone first, then both
    let a_rosters: Vec<_> = signaling
        .messages_for(a.connection)
        .await
        .into_iter()
        .filter(|m| m.kind() == "player-list")
        .collect();
    assert_eq!(a_rosters.len(), 2);
    assert_eq!(
        signaling.last_roster_for(a.connection).await,
        Some(players(&["a", "b"]))
    );
    assert_eq!(
        signaling.last_roster_for(b.connection).await,
        Some(players(&["a", "b"]))
    );

    let roster = &rooms[&RoomId::from("R1")];
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[1].player_name, "B");
}
