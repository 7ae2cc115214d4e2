use blockparty_core::RoomId;
use std::time::Duration;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{TestPeer, players};

#[tokio::test(start_paused = true)]
async fn test_sweep_drops_orphaned_participants() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R7");
    let ghost = TestPeer::new(&relay, "ghost", "R7");
    let lone_ghost = TestPeer::new(&relay, "lone", "R8");
    a.join().await;
    ghost.send_join().await;
    lone_ghost.send_join().await;

    let rooms = relay.rooms().await.expect("relay stopped");
    assert_eq!(rooms[&RoomId::from("R7")].len(), 2);
    assert!(rooms.contains_key(&RoomId::from("R8")));

    // Nothing changes before the first sweep.
    signaling.clear().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(relay.rooms().await.expect("relay stopped").len(), 2);
    assert!(signaling.messages_for(a.connection).await.is_empty());

    tokio::time::sleep(Duration::from_secs(31)).await;

    let rooms = relay.rooms().await.expect("relay stopped");
    let r7: Vec<_> = rooms[&RoomId::from("R7")]
        .iter()
        .map(|p| p.player_id.clone())
        .collect();
    assert_eq!(r7, players(&["a"]));
    assert!(!rooms.contains_key(&RoomId::from("R8")));
    assert_eq!(
        signaling.last_roster_for(a.connection).await,
        Some(players(&["a"]))
    );
}
