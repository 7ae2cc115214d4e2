use crate::RelayError;
use crate::room::{ConnectionId, RelayCommand, RoomRegistry, RoomsSnapshot, route};
use crate::signaling::SignalingOutput;
use blockparty_core::{PlayerListData, ProtocolError, RoomId, SignalingMessage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// The relay's single owner of room state.
///
/// Commands are handled one at a time, so a membership change and the roster
/// broadcast it causes are never interleaved with another command. The
/// periodic sweep removes participants whose socket is no longer open and
/// any room left without members.
pub struct Relay {
    registry: RoomRegistry,
    /// Sockets announced with `Connected` and not yet `Disconnected`.
    live: HashSet<ConnectionId>,
    command_rx: mpsc::Receiver<RelayCommand>,
    signaling: Arc<dyn SignalingOutput>,
    sweep_interval: Duration,
}

impl Relay {
    pub fn new(
        command_rx: mpsc::Receiver<RelayCommand>,
        signaling: Arc<dyn SignalingOutput>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(),
            live: HashSet::new(),
            command_rx,
            signaling,
            sweep_interval,
        }
    }

    pub async fn run(mut self) {
        info!("Relay event loop started");

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        sweep.tick().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down relay.");
                            break;
                        }
                    }
                }

                _ = sweep.tick() => self.sweep().await,
            }
        }

        info!("Relay event loop finished");
    }

    async fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Connected { connection } => {
                debug!("Connection {} opened", connection);
                self.live.insert(connection);
            }

            RelayCommand::Inbound { connection, text } => {
                self.handle_frame(connection, &text).await;
            }

            RelayCommand::Disconnected { connection } => {
                self.live.remove(&connection);
                let Some(participant) = self.registry.participant(connection).cloned() else {
                    return;
                };
                info!(
                    "Player {} disconnected from room {}",
                    participant.player_id, participant.room_id
                );
                self.leave(connection).await;
            }

            RelayCommand::Inspect { reply } => {
                let snapshot: RoomsSnapshot = self
                    .registry
                    .room_ids()
                    .into_iter()
                    .map(|id| {
                        let roster = self.registry.roster(&id);
                        (id, roster)
                    })
                    .collect();
                let _ = reply.send(snapshot);
            }
        }
    }

    async fn handle_frame(&mut self, connection: ConnectionId, text: &str) {
        let message = match SignalingMessage::parse(text) {
            Ok(m) => m,
            Err(ProtocolError::UnknownType(tag)) => {
                warn!("Unknown message type '{}' from {}", tag, connection);
                return;
            }
            Err(e) => {
                warn!("Discarding message from {}: {}", connection, e);
                return;
            }
        };

        match message {
            SignalingMessage::JoinRoom {
                from,
                room_id,
                data,
            } => {
                info!("Player {} ({}) joined room {}", data.player_name, from, room_id);
                let outcome = self
                    .registry
                    .join(connection, room_id, from, data.player_name);
                if let Some(previous) = outcome.previous {
                    self.after_leave(&previous.room_id, previous.room_deleted)
                        .await;
                }
                self.broadcast_roster(&outcome.room_id).await;
            }

            SignalingMessage::LeaveRoom { from, room_id } => {
                info!("Player {} left room {}", from, room_id);
                self.leave(connection).await;
            }

            SignalingMessage::PlayerList { .. } => {
                warn!("Ignoring player-list sent by client {}", connection);
            }

            routed => {
                let recipients = route(&self.registry, connection, &routed);
                debug!(
                    "Routing {} from {} to {} connection(s)",
                    routed.kind(),
                    connection,
                    recipients.len()
                );
                for recipient in recipients {
                    self.signaling.send_text(recipient, text.to_owned()).await;
                }
            }
        }
    }

    async fn leave(&mut self, connection: ConnectionId) {
        let Some(membership) = self.registry.leave(connection) else {
            return;
        };
        self.after_leave(&membership.room_id, membership.room_deleted)
            .await;
    }

    async fn after_leave(&self, room_id: &RoomId, room_deleted: bool) {
        if room_deleted {
            info!("Room {} deleted (empty)", room_id);
            return;
        }
        self.broadcast_roster(room_id).await;
    }

    async fn broadcast_roster(&self, room_id: &RoomId) {
        let message = SignalingMessage::PlayerList {
            room_id: room_id.clone(),
            data: PlayerListData {
                players: self.registry.roster(room_id),
            },
        };
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize player list for {}: {}", room_id, e);
                return;
            }
        };
        for connection in self.registry.room_members(room_id) {
            self.signaling.send_text(*connection, json.clone()).await;
        }
    }

    async fn sweep(&mut self) {
        let orphans: Vec<ConnectionId> = self
            .registry
            .connections()
            .into_iter()
            .filter(|c| !self.live.contains(c))
            .collect();
        for connection in orphans {
            warn!("Dropping participant {} with no open socket", connection);
            self.leave(connection).await;
        }

        for room_id in self.registry.sweep() {
            info!("Cleaned up empty room: {}", room_id);
        }
    }
}

/// Owner side of a running [`Relay`].
#[derive(Debug, Clone)]
pub struct RelayHandle {
    command_tx: mpsc::Sender<RelayCommand>,
    task: Arc<JoinHandle<()>>,
}

impl RelayHandle {
    /// Spawns the relay loop on the current runtime.
    pub fn spawn(
        command_tx: mpsc::Sender<RelayCommand>,
        command_rx: mpsc::Receiver<RelayCommand>,
        signaling: Arc<dyn SignalingOutput>,
        sweep_interval: Duration,
    ) -> Self {
        let relay = Relay::new(command_rx, signaling, sweep_interval);
        Self {
            command_tx,
            task: Arc::new(tokio::spawn(relay.run())),
        }
    }

    pub fn sender(&self) -> mpsc::Sender<RelayCommand> {
        self.command_tx.clone()
    }

    pub async fn rooms(&self) -> Result<RoomsSnapshot, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RelayCommand::Inspect { reply })
            .await
            .map_err(|_| RelayError::Stopped)?;
        rx.await.map_err(|_| RelayError::Stopped)
    }

    /// Stops the relay loop. Queued commands are dropped.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}
