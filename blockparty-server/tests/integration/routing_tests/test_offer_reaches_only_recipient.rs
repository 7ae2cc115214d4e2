use blockparty_core::SignalingMessage;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::TestPeer;

#[tokio::test]
async fn test_offer_reaches_only_recipient() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    let c = TestPeer::new(&relay, "c", "R1");
    a.join().await;
    b.join().await;
    c.join().await;

    a.offer_to("b").await;
    relay.rooms().await.expect("relay stopped");

    let to_b = signaling.routed_to(b.connection).await;
    assert_eq!(to_b.len(), 1);
    assert!(matches!(
        &to_b[0],
        SignalingMessage::Offer { from, data, .. }
            if from.as_str() == "a" && data.sdp == "v=0 from a"
    ));
    assert!(signaling.routed_to(a.connection).await.is_empty());
    assert!(signaling.routed_to(c.connection).await.is_empty());
}

#[tokio::test]
async fn test_offer_is_forwarded_verbatim() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    a.join().await;
    b.join().await;

    let raw = r#"{"type":"offer","from":"a","to":"b","roomId":"R1","data":{"type":"offer","sdp":"v=0\r\n"}}"#;
    a.send_raw(raw).await;
    relay.rooms().await.expect("relay stopped");

    let frames = signaling.raw_frames_for(b.connection).await;
    assert_eq!(frames.last().map(String::as_str), Some(raw));
}

#[tokio::test]
async fn test_unknown_recipient_is_silently_dropped() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = TestPeer::new(&relay, "a", "R1");
    let b = TestPeer::new(&relay, "b", "R1");
    let elsewhere = TestPeer::new(&relay, "ghost", "R9");
    a.join().await;
    b.join().await;
    elsewhere.join().await;

    a.offer_to("nobody").await;
    // right player id, wrong room
    a.offer_to("ghost").await;
    relay.rooms().await.expect("relay stopped");

    assert!(signaling.routed_to(a.connection).await.is_empty());
    assert!(signaling.routed_to(b.connection).await.is_empty());
    assert!(signaling.routed_to(elsewhere.connection).await.is_empty());
}
