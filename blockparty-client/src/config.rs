use blockparty_core::sync::Identity;
use blockparty_core::utils::CONNECT_TIMEOUT_MS;
use blockparty_core::{IceServerConfig, default_ice_servers};
use std::time::Duration;

/// How long `Session::connect` waits for the relay to acknowledge the join.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(CONNECT_TIMEOUT_MS);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the relay, e.g. `ws://localhost:3001/ws`.
    pub relay_url: String,
    pub identity: Identity,
    pub ice_servers: Vec<IceServerConfig>,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(relay_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            relay_url: relay_url.into(),
            identity,
            ice_servers: default_ice_servers(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}
