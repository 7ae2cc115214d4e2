use crate::room::{ConnectionId, Participant};
use blockparty_core::{PlayerId, PlayerInfo, RoomId};
use std::collections::HashMap;

/// A room whose membership changed. Its roster has to be re-sent unless the
/// room is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub room_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    /// Set when the connection was moved out of another room by this join.
    pub previous: Option<Membership>,
}

#[derive(Debug, Default)]
struct Room {
    /// Connections in join order.
    members: Vec<ConnectionId>,
}

/// Rooms and the participants in them. Lives only as long as the process.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    participants: HashMap<ConnectionId, Participant>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` in `room_id`, creating the room on first use.
    ///
    /// Joining again from the same connection overwrites the previous
    /// registration; a duplicate player id from another connection is kept
    /// as a separate participant.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        room_id: RoomId,
        player_id: PlayerId,
        player_name: String,
    ) -> JoinOutcome {
        let moving = self
            .participants
            .get(&connection)
            .is_some_and(|existing| existing.room_id != room_id);
        let previous = if moving { self.leave(connection) } else { None };

        self.participants.insert(
            connection,
            Participant {
                connection,
                player_id,
                room_id: room_id.clone(),
                player_name,
            },
        );

        let room = self.rooms.entry(room_id.clone()).or_default();
        if !room.members.contains(&connection) {
            room.members.push(connection);
        }

        JoinOutcome { room_id, previous }
    }

    /// Removes `connection` from its room. `None` if it was never registered.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<Membership> {
        let participant = self.participants.remove(&connection)?;
        let room_id = participant.room_id;

        let room_deleted = match self.rooms.get_mut(&room_id) {
            Some(room) => {
                room.members.retain(|c| *c != connection);
                room.members.is_empty()
            }
            None => false,
        };
        if room_deleted {
            self.rooms.remove(&room_id);
        }

        Some(Membership {
            room_id,
            room_deleted,
        })
    }

    /// Drops every room without members and returns their ids.
    pub fn sweep(&mut self) -> Vec<RoomId> {
        let mut empty: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.members.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        empty.sort();
        for id in &empty {
            self.rooms.remove(id);
        }
        empty
    }

    pub fn room_members(&self, room_id: &RoomId) -> &[ConnectionId] {
        self.rooms
            .get(room_id)
            .map(|room| room.members.as_slice())
            .unwrap_or_default()
    }

    /// Every registered connection, whatever room it is in.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.participants.keys().copied().collect()
    }

    pub fn participant(&self, connection: ConnectionId) -> Option<&Participant> {
        self.participants.get(&connection)
    }

    /// First connection in `room_id` registered as `player_id`.
    pub fn find_player(&self, room_id: &RoomId, player_id: &PlayerId) -> Option<ConnectionId> {
        self.room_members(room_id).iter().copied().find(|c| {
            self.participants
                .get(c)
                .is_some_and(|p| p.player_id == *player_id)
        })
    }

    pub fn roster(&self, room_id: &RoomId) -> Vec<PlayerInfo> {
        self.room_members(room_id)
            .iter()
            .filter_map(|c| self.participants.get(c))
            .map(Participant::info)
            .collect()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
