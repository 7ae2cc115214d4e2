pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

pub const DEFAULT_RELAY_PORT: u16 = 3001;

/// Interval between empty-room sweeps on the relay.
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Period of the local state broadcast.
pub const BROADCAST_INTERVAL_MS: u64 = 100;

/// How long after a peer started its game a newcomer may still start alongside it.
pub const GAME_START_GRACE_MS: u64 = 10_000;

/// How long a client waits for the relay to acknowledge its join.
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Label of the direct data channel opened between two players.
pub const DATA_CHANNEL_LABEL: &str = "gameData";

#[cfg(not(target_arch = "wasm32"))]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
