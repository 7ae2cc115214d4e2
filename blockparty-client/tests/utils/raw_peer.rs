use anyhow::{Context, Result, bail};
use blockparty_core::{GameState, JoinData, PlayerId, RoomId, SignalingMessage};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const WAIT_MS: u64 = 3000;

/// A player that only talks to the relay and never answers offers, so every
/// state it exchanges has to travel through the relay.
pub struct RawPeer {
    pub player_id: PlayerId,
    pub room_id: RoomId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RawPeer {
    pub async fn join(url: &str, player: &str, room: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        let mut peer = Self {
            player_id: PlayerId::from(player),
            room_id: RoomId::from(room),
            stream,
        };

        let join = SignalingMessage::JoinRoom {
            from: peer.player_id.clone(),
            room_id: peer.room_id.clone(),
            data: JoinData {
                player_name: player.to_uppercase(),
            },
        };
        peer.send(&join).await?;
        Ok(peer)
    }

    pub async fn send(&mut self, message: &SignalingMessage) -> Result<()> {
        self.stream.send(Message::Text(message.to_json()?)).await?;
        Ok(())
    }

    pub async fn send_state(&mut self, score: u64, timestamp: u64) -> Result<()> {
        let mut state = GameState::idle(self.player_id.clone(), self.player_id.as_str().to_uppercase());
        state.score = score;
        state.timestamp = timestamp;
        let message = SignalingMessage::GameState {
            from: self.player_id.clone(),
            room_id: self.room_id.clone(),
            data: state,
        };
        self.send(&message).await
    }

    pub async fn next_matching<F>(&mut self, pred: F) -> Result<SignalingMessage>
    where
        F: Fn(&SignalingMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(WAIT_MS);
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .context("Timed out waiting for the relay")?;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let message = SignalingMessage::parse(&text)?;
                    if pred(&message) {
                        return Ok(message);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => bail!("socket error: {e}"),
                None => bail!("relay closed the socket"),
            }
        }
    }

    /// Collects every frame matching `pred` for `window_ms`.
    pub async fn collect<F>(&mut self, window_ms: u64, pred: F) -> Result<Vec<SignalingMessage>>
    where
        F: Fn(&SignalingMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(window_ms);
        let mut seen = Vec::new();
        while let Ok(frame) = tokio::time::timeout_at(deadline, self.stream.next()).await {
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let message = SignalingMessage::parse(&text)?;
                    if pred(&message) {
                        seen.push(message);
                    }
                }
                Some(Ok(_)) => {}
                _ => break,
            }
        }
        Ok(seen)
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

pub fn is_state(message: &SignalingMessage) -> bool {
    matches!(message, SignalingMessage::GameState { .. })
}

pub fn state_of(message: &SignalingMessage) -> Option<&GameState> {
    match message {
        SignalingMessage::GameState { data, .. } => Some(data),
        _ => None,
    }
}
