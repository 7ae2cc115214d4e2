use blockparty_core::utils::{DEFAULT_RELAY_PORT, SWEEP_INTERVAL_SECS};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// How often rooms left without members are swept.
    pub sweep_interval: Duration,
    /// Capacity of the relay command queue shared by all sockets.
    pub command_buffer: usize,
}

impl RelayConfig {
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_RELAY_PORT)),
            sweep_interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
            command_buffer: 256,
        }
    }
}
