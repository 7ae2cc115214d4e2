use crate::session::handlers::SessionHandlers;
use crate::session::link_status::LinkStatus;
use crate::session::session_command::SessionCommand;
use crate::transport::{LinkEvent, LinkEventKind, PeerLink};
use anyhow::{Context, Result, anyhow};
use blockparty_core::sync::{
    CandidateDisposition, Identity, Negotiation, NegotiationState, PeerAction, PeerTable, Roster,
    StateUpdate,
};
use blockparty_core::{
    GameState, IceCandidate, IceServerConfig, PlayerId, PlayerInfo, SessionDescription,
    SignalingMessage,
};
use futures::StreamExt;
use futures::stream::SplitStream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event loop of one client session.
///
/// Owns the relay socket's read half, every `PeerLink` and the negotiation
/// table. State updates from both delivery paths end up in the shared roster.
/// Losing the relay after the join keeps the loop alive on the direct
/// channels; only a disconnect or a dropped handle ends it.
pub(crate) struct SessionLoop {
    identity: Identity,
    ice_servers: Vec<IceServerConfig>,

    ws_rx: SplitStream<WsStream>,
    relay_open: bool,
    /// Frames for the writer task that owns the socket's write half.
    out_tx: mpsc::UnboundedSender<Message>,

    command_rx: mpsc::UnboundedReceiver<SessionCommand>,

    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,

    peers: PeerTable,
    links: HashMap<PlayerId, PeerLink>,
    next_serial: u64,

    roster: Arc<Mutex<Roster>>,
    status: Arc<LinkStatus>,
    handlers: SessionHandlers,

    /// Fired on the first roster that lists the local player.
    joined: Option<oneshot::Sender<()>>,
    left: bool,
}

impl SessionLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: Identity,
        ice_servers: Vec<IceServerConfig>,
        ws_rx: SplitStream<WsStream>,
        out_tx: mpsc::UnboundedSender<Message>,
        command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        roster: Arc<Mutex<Roster>>,
        status: Arc<LinkStatus>,
        handlers: SessionHandlers,
        joined: oneshot::Sender<()>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let peers = PeerTable::new(identity.player_id.clone());

        Self {
            identity,
            ice_servers,
            ws_rx,
            relay_open: true,
            out_tx,
            command_rx,
            link_rx,
            link_tx,
            peers,
            links: HashMap::new(),
            next_serial: 0,
            roster,
            status,
            handlers,
            joined: Some(joined),
            left: false,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(
            "Session for {} in room {} started",
            self.identity.player_id, self.identity.room_id
        );

        let mut disconnected = None;
        loop {
            tokio::select! {
                frame = self.ws_rx.next(), if self.relay_open => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text).await,
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Relay closed the connection");
                            if !self.relay_lost() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Relay socket error: {}", e);
                            if !self.relay_lost() {
                                break;
                            }
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::SendState(state)) => self.broadcast_state(state).await,
                        Some(SessionCommand::Disconnect { done }) => {
                            disconnected = Some(done);
                            break;
                        }
                        None => {
                            debug!("Session handle dropped");
                            break;
                        }
                    }
                }

                Some(event) = self.link_rx.recv() => self.handle_link_event(event).await,
            }
        }

        self.shutdown().await;
        self.command_rx.close();
        if let Some(done) = disconnected {
            let _ = done.send(());
        }
        info!("Session for {} finished", self.identity.player_id);
    }

    /// Returns whether the session carries on without the relay, which it
    /// does once joined.
    fn relay_lost(&mut self) -> bool {
        self.relay_open = false;
        self.status.relay_lost();
        if self.joined.is_some() {
            return false;
        }
        warn!(
            "Lost the relay, keeping {} direct channel(s)",
            self.status.direct_peers().len()
        );
        true
    }

    async fn handle_frame(&mut self, text: &str) {
        let message = match SignalingMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Discarding frame from relay: {}", e);
                return;
            }
        };

        if *message.room_id() != self.identity.room_id {
            debug!("Ignoring {} for room {}", message.kind(), message.room_id());
            return;
        }
        if message
            .recipient()
            .is_some_and(|to| *to != self.identity.player_id)
        {
            debug!("Ignoring {} addressed to someone else", message.kind());
            return;
        }

        match message {
            SignalingMessage::PlayerList { data, .. } => self.handle_player_list(data.players).await,
            SignalingMessage::Offer { from, data, .. } => {
                if let Err(e) = self.handle_offer(&from, &data).await {
                    warn!("Could not answer {}, staying on relay: {:#}", from, e);
                    self.drop_link(&from).await;
                }
            }
            SignalingMessage::Answer { from, data, .. } => {
                if let Err(e) = self.handle_answer(&from, &data).await {
                    warn!("Could not apply answer from {}, staying on relay: {:#}", from, e);
                    self.drop_link(&from).await;
                }
            }
            SignalingMessage::IceCandidate { from, data, .. } => {
                self.handle_candidate(&from, data).await
            }
            SignalingMessage::GameState { from, data, .. } => self.apply_state(&from, &data),
            other => debug!("Ignoring {} from relay", other.kind()),
        }
    }

    async fn handle_player_list(&mut self, players: Vec<PlayerInfo>) {
        let listed_self = players
            .iter()
            .any(|p| p.player_id == self.identity.player_id);
        if listed_self {
            if let Some(joined) = self.joined.take() {
                info!("Joined room {}", self.identity.room_id);
                let _ = joined.send(());
            }
        }

        for action in self.peers.on_roster(&players) {
            match action {
                PeerAction::Initiate(peer) => {
                    if let Err(e) = self.initiate(&peer).await {
                        warn!("Could not offer to {}, staying on relay: {:#}", peer, e);
                        self.drop_link(&peer).await;
                    }
                }
                PeerAction::Teardown(peer) => {
                    info!("{} left the room", peer);
                    self.close_link(&peer).await;
                }
            }
        }

        let diff = self
            .roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_player_list(&players);
        if let Some(handler) = &self.handlers.on_roster {
            handler(&diff, &players);
        }
    }

    async fn initiate(&mut self, peer: &PlayerId) -> Result<()> {
        self.negotiation(peer)?.begin_offer()?;
        let offer = self.open_link(peer).await?.create_offer().await?;

        self.send_signal(SignalingMessage::Offer {
            from: self.identity.player_id.clone(),
            to: peer.clone(),
            room_id: self.identity.room_id.clone(),
            data: offer,
        })?;
        self.negotiation(peer)?.offer_sent()?;
        debug!("Sent offer to {}", peer);
        Ok(())
    }

    async fn handle_offer(&mut self, from: &PlayerId, offer: &SessionDescription) -> Result<()> {
        if self.peers.accept_offer(from)? {
            debug!("Replacing earlier connection with {}", from);
        }
        self.close_link(from).await;

        let answer = self.open_link(from).await?.accept_offer(offer).await?;
        let pending = self.negotiation(from)?.offer_applied()?;
        self.apply_candidates(from, pending).await;

        self.send_signal(SignalingMessage::Answer {
            from: self.identity.player_id.clone(),
            to: from.clone(),
            room_id: self.identity.room_id.clone(),
            data: answer,
        })?;
        debug!("Answered offer from {}", from);
        Ok(())
    }

    async fn handle_answer(&mut self, from: &PlayerId, answer: &SessionDescription) -> Result<()> {
        let awaiting = self
            .peers
            .get(from)
            .is_some_and(|n| n.state() == NegotiationState::AwaitingAnswer);
        if !awaiting {
            debug!("Ignoring answer from {} outside of an offer", from);
            return Ok(());
        }
        let Some(link) = self.links.get(from) else {
            debug!("Answer from {} without a pending offer", from);
            return Ok(());
        };
        link.apply_answer(answer).await?;
        let pending = self.negotiation(from)?.answer_applied()?;
        self.apply_candidates(from, pending).await;
        Ok(())
    }

    async fn handle_candidate(&mut self, from: &PlayerId, candidate: IceCandidate) {
        let Some(negotiation) = self.peers.get_mut(from) else {
            debug!("Candidate from {} without a negotiation", from);
            return;
        };
        match negotiation.remote_candidate(candidate) {
            CandidateDisposition::Apply(candidate) => {
                self.apply_candidates(from, vec![candidate]).await
            }
            CandidateDisposition::Buffered => debug!("Buffered early candidate from {}", from),
            CandidateDisposition::Discarded => {}
        }
    }

    async fn apply_candidates(&self, from: &PlayerId, candidates: Vec<IceCandidate>) {
        let Some(link) = self.links.get(from) else {
            return;
        };
        for candidate in &candidates {
            if let Err(e) = link.add_candidate(candidate).await {
                warn!("Failed to add candidate from {}: {:#}", from, e);
            }
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        let LinkEvent { peer, serial, kind } = event;
        let current = self
            .links
            .get(&peer)
            .is_some_and(|link| link.serial() == serial);
        if !current {
            return;
        }

        match kind {
            LinkEventKind::CandidateGenerated(candidate) => {
                let message = SignalingMessage::IceCandidate {
                    from: self.identity.player_id.clone(),
                    to: peer.clone(),
                    room_id: self.identity.room_id.clone(),
                    data: candidate,
                };
                if let Err(e) = self.send_signal(message) {
                    debug!("Dropping local candidate for {}: {:#}", peer, e);
                }
            }
            LinkEventKind::ChannelReady(channel) => {
                if let Some(link) = self.links.get_mut(&peer) {
                    link.set_channel(channel);
                }
                match self.peers.get_mut(&peer).map(|n| n.channel_open()) {
                    Some(Ok(())) => {
                        self.status.channel_opened(&peer);
                        info!("Direct channel with {} connected", peer);
                    }
                    Some(Err(e)) => warn!("Channel with {} opened out of order: {}", peer, e),
                    None => {}
                }
            }
            LinkEventKind::Message(text) => match serde_json::from_str::<GameState>(&text) {
                Ok(state) => self.apply_state(&peer, &state),
                Err(e) => warn!("Discarding direct message from {}: {}", peer, e),
            },
            LinkEventKind::Disconnected => {
                warn!("Direct channel with {} lost, falling back to relay", peer);
                self.drop_link(&peer).await;
            }
        }
    }

    fn apply_state(&self, from: &PlayerId, state: &GameState) {
        let view = {
            let mut roster = self.roster.lock().unwrap_or_else(PoisonError::into_inner);
            match roster.apply_game_state(from, state) {
                StateUpdate::Applied { created } => {
                    if created {
                        debug!("First state from {} arrived before the roster", from);
                    }
                    roster.peer(from).cloned()
                }
                StateUpdate::Stale => {
                    debug!("Dropping stale state from {}", from);
                    None
                }
                StateUpdate::Ignored => None,
            }
        };

        if let (Some(view), Some(handler)) = (view, &self.handlers.on_peer_state) {
            handler(&view);
        }
    }

    /// Sends the local state through the relay and on every open channel.
    async fn broadcast_state(&mut self, state: GameState) {
        let direct = match serde_json::to_string(&state) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not serialize local state: {}", e);
                return;
            }
        };

        let relayed = SignalingMessage::GameState {
            from: self.identity.player_id.clone(),
            room_id: self.identity.room_id.clone(),
            data: state,
        };
        if let Err(e) = self.send_signal(relayed) {
            debug!("Relay path unavailable: {:#}", e);
        }

        for link in self.links.values().filter(|link| link.has_channel()) {
            if let Err(e) = link.send_text(&direct).await {
                debug!("Direct send to {} failed: {:#}", link.peer(), e);
            }
        }
    }

    async fn open_link(&mut self, peer: &PlayerId) -> Result<&PeerLink> {
        self.next_serial += 1;
        let link = PeerLink::new(
            peer.clone(),
            self.next_serial,
            &self.ice_servers,
            self.link_tx.clone(),
        )
        .await
        .with_context(|| format!("Failed to create peer connection for {peer}"))?;

        self.links.insert(peer.clone(), link);
        self.links
            .get(peer)
            .ok_or_else(|| anyhow!("link for {peer} vanished"))
    }

    fn negotiation(&mut self, peer: &PlayerId) -> Result<&mut Negotiation> {
        self.peers
            .get_mut(peer)
            .ok_or_else(|| anyhow!("no negotiation with {peer}"))
    }

    /// Closes the connection but keeps the negotiation entry.
    async fn close_link(&mut self, peer: &PlayerId) {
        self.status.channel_closed(peer);
        if let Some(link) = self.links.remove(peer) {
            if let Err(e) = link.close().await {
                debug!("Error closing link with {}: {:#}", peer, e);
            }
        }
    }

    /// Closes the connection and forgets the negotiation; the peer stays
    /// reachable through the relay.
    async fn drop_link(&mut self, peer: &PlayerId) {
        self.peers.remove(peer);
        self.close_link(peer).await;
    }

    fn send_signal(&self, message: SignalingMessage) -> Result<()> {
        let text = message.to_json()?;
        self.out_tx
            .send(Message::Text(text))
            .map_err(|_| anyhow!("relay writer has stopped"))
    }

    async fn shutdown(&mut self) {
        if self.left {
            return;
        }
        self.left = true;

        let leave = SignalingMessage::LeaveRoom {
            from: self.identity.player_id.clone(),
            room_id: self.identity.room_id.clone(),
        };
        if self.send_signal(leave).is_ok() {
            let _ = self.out_tx.send(Message::Close(None));
        }

        for peer in self.peers.close_all() {
            self.close_link(&peer).await;
        }
        let leftover: Vec<PlayerId> = self.links.keys().cloned().collect();
        for peer in leftover {
            self.close_link(&peer).await;
        }

        self.status.clear();
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("Left room {}", self.identity.room_id);
    }
}
