mod game_state;
mod ice;
mod ids;
mod signaling;

pub use game_state::{BOARD_COLS, BOARD_ROWS, Board, Cell, GameState, PieceSnapshot, empty_board};
pub use ice::{IceServerConfig, default_ice_servers};
pub use ids::{PlayerId, RoomId};
pub use signaling::{
    IceCandidate, JoinData, PlayerInfo, PlayerListData, ProtocolError, SdpType,
    SessionDescription, SignalingMessage,
};
