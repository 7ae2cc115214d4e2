use crate::room::ConnectionId;
use blockparty_core::{PlayerInfo, RoomId};
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// Rosters of every room at one instant.
pub type RoomsSnapshot = BTreeMap<RoomId, Vec<PlayerInfo>>;

/// Events fed to the relay by the WebSocket layer.
#[derive(Debug)]
pub enum RelayCommand {
    /// A socket was accepted. Only announced connections survive the sweep.
    Connected { connection: ConnectionId },

    /// A text frame arrived on `connection`.
    Inbound {
        connection: ConnectionId,
        text: String,
    },

    /// The socket closed, cleanly or not.
    Disconnected { connection: ConnectionId },

    /// Read-only view of the registry, answered between two mutations.
    Inspect { reply: oneshot::Sender<RoomsSnapshot> },
}
