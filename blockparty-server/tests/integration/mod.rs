pub mod socket_tests;

use blockparty_server::RelayHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

use crate::utils::MockSignalingOutput;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_relay() -> (RelayHandle, MockSignalingOutput) {
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    let signaling = MockSignalingOutput::new();

    let relay = RelayHandle::spawn(
        cmd_tx,
        cmd_rx,
        Arc::new(signaling.clone()),
        Duration::from_secs(60),
    );

    (relay, signaling)
}
