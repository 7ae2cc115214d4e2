use crate::model::{GameState, PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const KNOWN_TYPES: [&str; 7] = [
    "join-room",
    "leave-room",
    "offer",
    "answer",
    "ice-candidate",
    "game-state",
    "player-list",
];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("message has no type tag")]
    MissingType,

    #[error("unknown message type '{0}'")]
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub player_name: String,
}

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerListData {
    pub players: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Reachability candidate in the shape browsers produce from `RTCIceCandidate.toJSON()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Everything exchanged with the relay. `to` addresses a single player; messages
/// without it are room broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalingMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        from: PlayerId,
        room_id: RoomId,
        data: JoinData,
    },

    #[serde(rename_all = "camelCase")]
    LeaveRoom { from: PlayerId, room_id: RoomId },

    #[serde(rename_all = "camelCase")]
    Offer {
        from: PlayerId,
        to: PlayerId,
        room_id: RoomId,
        data: SessionDescription,
    },

    #[serde(rename_all = "camelCase")]
    Answer {
        from: PlayerId,
        to: PlayerId,
        room_id: RoomId,
        data: SessionDescription,
    },

    #[serde(rename_all = "camelCase")]
    IceCandidate {
        from: PlayerId,
        to: PlayerId,
        room_id: RoomId,
        data: IceCandidate,
    },

    #[serde(rename_all = "camelCase")]
    GameState {
        from: PlayerId,
        room_id: RoomId,
        data: GameState,
    },

    /// Only ever produced by the relay.
    #[serde(rename_all = "camelCase")]
    PlayerList {
        room_id: RoomId,
        data: PlayerListData,
    },
}

impl SignalingMessage {
    /// Parses a frame, telling apart unknown tags from broken payloads.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        match value.get("type").and_then(Value::as_str) {
            None => return Err(ProtocolError::MissingType),
            Some(tag) if !KNOWN_TYPES.contains(&tag) => {
                return Err(ProtocolError::UnknownType(tag.to_owned()));
            }
            Some(_) => {}
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::GameState { .. } => "game-state",
            Self::PlayerList { .. } => "player-list",
        }
    }

    pub fn sender(&self) -> Option<&PlayerId> {
        match self {
            Self::JoinRoom { from, .. }
            | Self::LeaveRoom { from, .. }
            | Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::IceCandidate { from, .. }
            | Self::GameState { from, .. } => Some(from),
            Self::PlayerList { .. } => None,
        }
    }

    pub fn recipient(&self) -> Option<&PlayerId> {
        match self {
            Self::Offer { to, .. } | Self::Answer { to, .. } | Self::IceCandidate { to, .. } => {
                Some(to)
            }
            _ => None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::LeaveRoom { room_id, .. }
            | Self::Offer { room_id, .. }
            | Self::Answer { room_id, .. }
            | Self::IceCandidate { room_id, .. }
            | Self::GameState { room_id, .. }
            | Self::PlayerList { room_id, .. } => room_id,
        }
    }
}
