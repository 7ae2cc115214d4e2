use anyhow::Result;
use blockparty_client::{ClientConfig, Session, SessionHandlers};
use blockparty_core::sync::Identity;
use blockparty_core::{PlayerId, RoomId};
use blockparty_server::{RelayConfig, RelayHandle, RelayServer};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;

/// Relay on an ephemeral loopback port, shut down on drop.
pub struct RelayHarness {
    pub addr: SocketAddr,
    pub relay: RelayHandle,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RelayHarness {
    pub async fn start() -> Result<Self> {
        let server =
            RelayServer::new(RelayConfig::default().with_bind(SocketAddr::from(([127, 0, 0, 1], 0))));
        let listener = server.bind().await?;
        let addr = listener.local_addr()?;
        let relay = server.relay();

        let (shutdown, rx) = oneshot::channel();
        tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        Ok(Self {
            addr,
            relay,
            shutdown: Some(shutdown),
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Client config with no STUN servers so negotiation stays on loopback.
    pub fn config(&self, player: &str, room: &str) -> ClientConfig {
        let identity = Identity::new(RoomId::from(room), PlayerId::from(player), player.to_uppercase());
        ClientConfig::new(self.url(), identity)
            .with_ice_servers(Vec::new())
            .with_connect_timeout(Duration::from_secs(5))
    }

    pub async fn session(&self, player: &str, room: &str, handlers: SessionHandlers) -> Result<Session> {
        Ok(Session::connect(self.config(player, room), handlers).await?)
    }

    /// Polls the relay until `room` is gone or a second has passed.
    pub async fn wait_room_gone(&self, room: &str) -> Result<bool> {
        let room = RoomId::from(room);
        for _ in 0..50 {
            if !self.relay.rooms().await?.contains_key(&room) {
                return Ok(true);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(false)
    }
}

impl Drop for RelayHarness {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Polls `condition` every 20 ms until it holds or `within` has passed.
pub async fn wait_until(within: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
