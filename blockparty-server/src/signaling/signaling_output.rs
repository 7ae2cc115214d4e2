use crate::room::ConnectionId;
use async_trait::async_trait;

/// Whatever owns the sockets. The relay hands it encoded frames and never
/// learns whether they arrived.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Send one JSON frame to a single connection.
    async fn send_text(&self, connection: ConnectionId, text: String);
}
