use crate::room::{ConnectionId, RoomRegistry};
use blockparty_core::SignalingMessage;

/// Connections a relayed message should be forwarded to.
///
/// Addressed messages reach at most one connection: the first member of the
/// named room registered under the `to` player id. `game-state` reaches every
/// other member of the named room. Room mutations and relay-originated
/// messages are not routed here and yield nothing.
pub fn route(
    registry: &RoomRegistry,
    sender: ConnectionId,
    message: &SignalingMessage,
) -> Vec<ConnectionId> {
    match message {
        SignalingMessage::Offer { to, room_id, .. }
        | SignalingMessage::Answer { to, room_id, .. }
        | SignalingMessage::IceCandidate { to, room_id, .. } => {
            registry.find_player(room_id, to).into_iter().collect()
        }

        SignalingMessage::GameState { room_id, .. } => registry
            .room_members(room_id)
            .iter()
            .copied()
            .filter(|c| *c != sender)
            .collect(),

        SignalingMessage::JoinRoom { .. }
        | SignalingMessage::LeaveRoom { .. }
        | SignalingMessage::PlayerList { .. } => Vec::new(),
    }
}
