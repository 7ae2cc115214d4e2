use crate::model::{PlayerId, RoomId};
use url::form_urlencoded;

/// Who a client is in which room, as carried in a shareable link
/// (`?room=ABC123&player=k3j9x&name=alice`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub player_name: String,
}

impl Identity {
    pub fn new(room_id: RoomId, player_id: PlayerId, player_name: impl Into<String>) -> Self {
        Self {
            room_id,
            player_id,
            player_name: player_name.into(),
        }
    }

    /// Fresh identity in a brand new room.
    pub fn create_room(player_name: impl Into<String>) -> Self {
        Self::new(RoomId::random(), PlayerId::random(), player_name)
    }

    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("room", self.room_id.as_str())
            .append_pair("player", self.player_id.as_str())
            .append_pair("name", &self.player_name)
            .finish()
    }

    /// Reads `room`, `player` and `name` from a query string (leading `?` optional).
    ///
    /// A link with only a room yields `Err(room)`: the holder can join that
    /// room but still has to choose a name. `Ok(None)` means no room at all.
    pub fn from_query(query: &str) -> Result<Option<Self>, RoomId> {
        let mut room = None;
        let mut player = None;
        let mut name = None;

        let query = query.trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "room" => room = Some(value.into_owned()),
                "player" => player = Some(value.into_owned()),
                "name" => name = Some(value.into_owned()),
                _ => {}
            }
        }

        let Some(room_id) = room.as_deref().and_then(RoomId::from_user_input) else {
            return Ok(None);
        };
        match (player, name) {
            (Some(player), Some(name)) => Ok(Some(Self::new(room_id, PlayerId::from(player), name))),
            _ => Err(room_id),
        }
    }
}
