use blockparty_core::{PlayerId, PlayerInfo, RoomId};
use std::fmt;
use uuid::Uuid;

/// Relay-side handle of one WebSocket. This, not the player id, is what the
/// registry keys on.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection: ConnectionId,
    pub player_id: PlayerId,
    pub room_id: RoomId,
    pub player_name: String,
}

impl Participant {
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.player_id.clone(),
            player_name: self.player_name.clone(),
        }
    }
}
