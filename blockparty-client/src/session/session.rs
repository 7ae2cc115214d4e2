use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::broadcast::BroadcastGuard;
use crate::session::handlers::SessionHandlers;
use crate::session::link_status::LinkStatus;
use crate::session::session_command::SessionCommand;
use crate::session::session_loop::SessionLoop;
use blockparty_core::sync::{Identity, PeerView, Roster, StartEligibility, StateClock};
use blockparty_core::utils::now_millis;
use blockparty_core::{GameState, JoinData, PlayerId, SignalingMessage};
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Stamps outgoing states and hands them to the session loop. Shared with
/// broadcast tasks.
pub(crate) struct Outbox {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    clock: Mutex<StateClock>,
}

impl Outbox {
    pub(crate) fn send_state(&self, mut state: GameState) -> Result<(), ClientError> {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stamp(&mut state, now_millis());
        self.command_tx
            .send(SessionCommand::SendState(state))
            .map_err(|_| ClientError::Closed)
    }
}

/// A joined room.
///
/// Dropping the session without calling [`Session::disconnect`] still leaves
/// the room once the loop notices the handle is gone.
pub struct Session {
    identity: Identity,
    outbox: Arc<Outbox>,
    roster: Arc<Mutex<Roster>>,
    status: Arc<LinkStatus>,
    task: JoinHandle<()>,
}

impl Session {
    /// Connects to the relay and joins the configured room.
    ///
    /// Resolves once the relay lists this player in the room's roster. Both the
    /// socket handshake and the join share `config.connect_timeout`.
    pub async fn connect(
        config: ClientConfig,
        handlers: SessionHandlers,
    ) -> Result<Self, ClientError> {
        let ClientConfig {
            relay_url,
            identity,
            ice_servers,
            connect_timeout,
        } = config;
        let deadline = Instant::now() + connect_timeout;

        let (stream, _) = tokio::time::timeout_at(deadline, connect_async(relay_url.as_str()))
            .await
            .map_err(|_| ClientError::ConnectTimeout(connect_timeout))?
            .map_err(|source| ClientError::Connect {
                url: relay_url.clone(),
                source,
            })?;
        debug!("Connected to relay at {}", relay_url);

        let (mut ws_tx, ws_rx) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if ws_tx.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let join = SignalingMessage::JoinRoom {
            from: identity.player_id.clone(),
            room_id: identity.room_id.clone(),
            data: JoinData {
                player_name: identity.player_name.clone(),
            },
        };
        out_tx
            .send(Message::Text(join.to_json()?))
            .map_err(|_| ClientError::Closed)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (joined_tx, joined_rx) = oneshot::channel();
        let roster = Arc::new(Mutex::new(Roster::new(identity.player_id.clone())));
        let status = Arc::new(LinkStatus::new());

        let session_loop = SessionLoop::new(
            identity.clone(),
            ice_servers,
            ws_rx,
            out_tx,
            command_rx,
            roster.clone(),
            status.clone(),
            handlers,
            joined_tx,
        );
        let task = tokio::spawn(session_loop.run());

        match tokio::time::timeout_at(deadline, joined_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(ClientError::Rejected),
            Err(_) => {
                task.abort();
                return Err(ClientError::ConnectTimeout(connect_timeout));
            }
        }

        info!(
            "{} joined room {} as {}",
            identity.player_name, identity.room_id, identity.player_id
        );

        Ok(Self {
            identity,
            outbox: Arc::new(Outbox {
                command_tx,
                clock: Mutex::new(StateClock::new()),
            }),
            roster,
            status,
            task,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Sends one snapshot through the relay and every open direct channel.
    ///
    /// The timestamp is raised if needed so successive states never go back
    /// in time.
    pub fn send_state(&self, state: GameState) -> Result<(), ClientError> {
        self.outbox.send_state(state)
    }

    /// Sends the latest value of `source` every 100 ms until the guard is
    /// stopped or dropped.
    pub fn start_broadcast(&self, source: watch::Receiver<GameState>) -> BroadcastGuard {
        BroadcastGuard::spawn(self.outbox.clone(), source)
    }

    pub fn can_start(&self) -> StartEligibility {
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .can_start(now_millis())
    }

    /// Snapshot of every remote player's last known state.
    pub fn peers(&self) -> Vec<PeerView> {
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .peers()
            .cloned()
            .collect()
    }

    /// Players reachable over an open direct channel.
    pub fn direct_peers(&self) -> Vec<PlayerId> {
        self.status.direct_peers()
    }

    /// False once the relay socket has gone away. Open direct channels keep
    /// working; roster updates stop.
    pub fn relay_connected(&self) -> bool {
        self.status.relay_connected()
    }

    /// True after [`Session::disconnect`] or once the session loop has ended.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Leaves the room, closes every direct channel and the relay socket.
    /// Calling it again is a no-op.
    pub async fn disconnect(&self) {
        let (done, wait) = oneshot::channel();
        if self
            .outbox
            .command_tx
            .send(SessionCommand::Disconnect { done })
            .is_err()
        {
            return;
        }
        let _ = wait.await;
    }
}
