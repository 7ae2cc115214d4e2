use anyhow::{Context, Result, bail};
use blockparty_core::SignalingMessage;
use blockparty_server::{RelayConfig, RelayHandle, RelayServer};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Timeout for a single expected frame (ms).
pub const FRAME_TIMEOUT_MS: u64 = 3000;

pub struct TestServer {
    pub addr: SocketAddr,
    pub relay: RelayHandle,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let config = RelayConfig::default().with_bind(SocketAddr::from(([127, 0, 0, 1], 0)));
        let server = RelayServer::new(config);
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

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Raw WebSocket participant speaking the relay's JSON protocol.
pub struct WsTestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTestClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, message: &SignalingMessage) -> Result<()> {
        self.send_raw(&message.to_json()?).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_owned())).await?;
        Ok(())
    }

    /// Waits for the next message matching `pred`, skipping others.
    pub async fn wait_for<F>(&mut self, pred: F) -> Result<SignalingMessage>
    where
        F: Fn(&SignalingMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(FRAME_TIMEOUT_MS);
        loop {
            let next = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .context("Timeout waiting for frame")?;
            match next {
                Some(Ok(Message::Text(text))) => {
                    let message = SignalingMessage::parse(&text)?;
                    if pred(&message) {
                        return Ok(message);
                    }
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("WebSocket error: {e}"),
                None => bail!("WebSocket closed"),
            }
        }
    }

    /// Asserts that nothing matching `pred` arrives within `quiet_ms`.
    pub async fn expect_none<F>(&mut self, quiet_ms: u64, pred: F) -> Result<()>
    where
        F: Fn(&SignalingMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(quiet_ms);
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(()),
                Ok(Some(Ok(Message::Text(text)))) => {
                    let message = SignalingMessage::parse(&text)?;
                    if pred(&message) {
                        bail!("Unexpected message: {message:?}");
                    }
                }
                Ok(Some(Ok(_))) => continue,
                Ok(_) => return Ok(()),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
