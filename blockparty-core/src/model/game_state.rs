use crate::model::PlayerId;
use serde::{Deserialize, Serialize};

pub const BOARD_ROWS: usize = 20;
pub const BOARD_COLS: usize = 10;

/// `None` is an empty cell, otherwise a colour index into the piece palette.
pub type Cell = Option<u8>;
pub type Board = Vec<Vec<Cell>>;

pub fn empty_board() -> Board {
    vec![vec![None; BOARD_COLS]; BOARD_ROWS]
}

/// A falling piece as the local simulation last saw it. Only rendered by peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceSnapshot {
    /// Cell offsets for each rotation.
    pub shape: Vec<Vec<[i32; 2]>>,
    pub color: String,
    pub rotation: usize,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player_id: PlayerId,
    pub player_name: String,
    pub board: Board,
    #[serde(default)]
    pub current: Option<PieceSnapshot>,
    #[serde(default)]
    pub next: Option<PieceSnapshot>,
    pub score: u64,
    pub game_over: bool,
    /// Milliseconds since the unix epoch at the sender.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_start_time: Option<u64>,
}

impl GameState {
    /// State of a player sitting in a room without a running game.
    pub fn idle(player_id: PlayerId, player_name: impl Into<String>) -> Self {
        Self {
            player_id,
            player_name: player_name.into(),
            board: empty_board(),
            current: None,
            next: None,
            score: 0,
            game_over: false,
            timestamp: 0,
            game_start_time: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some() && !self.game_over
    }
}
