use crate::room::{ConnectionId, RelayCommand};
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

struct SignalingInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

/// Outbound half of every open WebSocket, plus the way into the relay.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) relay_tx: mpsc::Sender<RelayCommand>,
}

impl SignalingService {
    pub fn new(relay_tx: mpsc::Sender<RelayCommand>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
            }),
            relay_tx,
        }
    }

    pub fn add_connection(&self, connection: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.connections.insert(connection, tx);
    }

    pub fn remove_connection(&self, connection: &ConnectionId) {
        self.inner.connections.remove(connection);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_text(&self, connection: ConnectionId, text: String) {
        let Some(peer) = self.inner.connections.get(&connection) else {
            debug!("Dropping frame for closed connection {}", connection);
            return;
        };
        if let Err(e) = peer.send(Message::Text(text.into())) {
            error!("Failed to send WS message to {}: {:?}", connection, e);
        }
    }
}
