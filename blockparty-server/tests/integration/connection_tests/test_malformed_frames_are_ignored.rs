use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{TestPeer, players};

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    a.join().await;

    b.send_raw("{not json").await;
    b.send_raw(r#"{"type":"chat","from":"b","roomId":"R1"}"#).await;
    b.send_raw(r#"{"type":"offer","from":"b","roomId":"R1"}"#).await;
    b.send_raw(r#"{"type":"player-list","roomId":"R1","data":{"players":[]}}"#)
        .await;
    relay.rooms().await.expect("relay stopped");

    assert!(signaling.messages_for(b.connection).await.is_empty());
    assert_eq!(
        signaling.last_roster_for(a.connection).await,
        Some(players(&["a"]))
    );

    // the same connection keeps working afterwards
    b.join().await;
    relay.rooms().await.expect("relay stopped");
    assert_eq!(
        signaling.last_roster_for(b.connection).await,
        Some(players(&["a", "b"]))
    );
}
