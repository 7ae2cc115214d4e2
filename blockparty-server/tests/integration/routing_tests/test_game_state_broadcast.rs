use blockparty_core::SignalingMessage;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::TestPeer;

#[tokio::test]
async fn test_game_state_broadcast() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    let c = TestPeer::new(&relay, "c", "R1");
    let outsider = TestPeer::new(&relay, "d", "R2");
    for peer in [&a, &b, &c, &outsider] {
        peer.join().await;
    }

    a.send_state(700).await;
    relay.rooms().await.expect("relay stopped");

    for peer in [&b, &c] {
        let routed = signaling.routed_to(peer.connection).await;
        assert_eq!(routed.len(), 1, "{} should get exactly one state", peer.player_id);
        assert!(matches!(
            &routed[0],
            SignalingMessage::GameState { from, data, .. } if from.as_str() == "a" && data.score == 700
        ));
    }
    assert!(signaling.routed_to(a.connection).await.is_empty());
    assert!(signaling.routed_to(outsider.connection).await.is_empty());
}
