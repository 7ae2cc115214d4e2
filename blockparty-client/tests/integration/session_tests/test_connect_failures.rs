use blockparty_client::{ClientConfig, ClientError, Session, SessionHandlers};
use blockparty_core::sync::Identity;
use blockparty_core::{PlayerId, RoomId};
use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::integration::init_tracing;

fn identity() -> Identity {
    Identity::new(RoomId::from("R9"), PlayerId::from("a"), "A")
}

#[tokio::test]
async fn test_unreachable_relay_is_a_connect_error() {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(format!("ws://{addr}/ws"), identity())
        .with_ice_servers(Vec::new());
    let result = Session::connect(config, SessionHandlers::default()).await;

    assert!(
        matches!(result, Err(ClientError::Connect { .. })),
        "expected a connect error"
    );
}

#[tokio::test]
async fn test_silent_relay_times_out() {
    init_tracing();

    // Accepts the socket but never sends a roster back.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let config = ClientConfig::new(format!("ws://{addr}/ws"), identity())
        .with_ice_servers(Vec::new())
        .with_connect_timeout(Duration::from_millis(300));
    let result = Session::connect(config, SessionHandlers::default()).await;

    match result {
        Err(ClientError::ConnectTimeout(waited)) => {
            assert_eq!(waited, Duration::from_millis(300))
        }
        Err(other) => panic!("expected a timeout, got {other}"),
        Ok(_) => panic!("join should never be acknowledged"),
    }
}
