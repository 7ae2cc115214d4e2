use crate::room::{RelayHandle, RoomsSnapshot};
use crate::signaling::{SignalingService, ws_handler};
use crate::{RelayConfig, RelayError};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

async fn health() -> &'static str {
    "ok"
}

/// HTTP surface of the relay: `/ws` for players, `/healthz` for probes.
pub fn app(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(health))
        .with_state(service)
}

/// A relay with its room task already running. Must be created inside a tokio runtime.
pub struct RelayServer {
    config: RelayConfig,
    service: SignalingService,
    relay: RelayHandle,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let service = SignalingService::new(command_tx.clone());
        let relay = RelayHandle::spawn(
            command_tx,
            command_rx,
            Arc::new(service.clone()),
            config.sweep_interval,
        );

        Self {
            config,
            service,
            relay,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn service(&self) -> &SignalingService {
        &self.service
    }

    pub fn relay(&self) -> RelayHandle {
        self.relay.clone()
    }

    pub async fn rooms(&self) -> Result<RoomsSnapshot, RelayError> {
        self.relay.rooms().await
    }

    pub async fn bind(&self) -> Result<TcpListener, RelayError> {
        let addr = self.config.bind;
        TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })
    }

    /// Serves on `listener` until `shutdown` resolves, then stops the relay task.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        info!("Relay listening on ws://{}/ws", addr);

        let result = axum::serve(listener, app(self.service.clone()))
            .with_graceful_shutdown(shutdown)
            .await;

        self.relay.shutdown();
        info!("Relay stopped");
        Ok(result?)
    }
}
