use crate::transport::link_event::{LinkEvent, LinkEventKind};
use anyhow::{Context, Result};
use blockparty_core::utils::DATA_CHANNEL_LABEL;
use blockparty_core::{IceCandidate, IceServerConfig, PlayerId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Direct connection to one remote player.
///
/// All callbacks report through `event_tx`; the session loop owns the link
/// and decides what to do with each event.
pub struct PeerLink {
    peer: PlayerId,
    serial: u64,
    peer_connection: Arc<RTCPeerConnection>,
    channel: Option<Arc<RTCDataChannel>>,
    event_tx: mpsc::UnboundedSender<LinkEvent>,
}

impl PeerLink {
    pub async fn new(
        peer: PlayerId,
        serial: u64,
        ice_servers: &[IceServerConfig],
        event_tx: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self> {
        // Codecs are registered even though only a data channel is used.
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        let state_peer = peer.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    debug!("Peer connection to {} is {:?}", peer, s);
                    if is_terminal(s) {
                        let _ = tx.send(LinkEvent {
                            peer,
                            serial,
                            kind: LinkEventKind::Disconnected,
                        });
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_peer = peer.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let peer = ice_peer.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(LinkEvent {
                    peer,
                    serial,
                    kind: LinkEventKind::CandidateGenerated(from_rtc_candidate(init)),
                });
            })
        }));

        // Responder side: the initiator opened the channel.
        let dc_tx = event_tx.clone();
        let dc_peer = peer.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let peer = dc_peer.clone();

            Box::pin(async move {
                debug!("Data channel '{}' offered by {}", dc.label(), peer);
                wire_channel(&dc, peer, serial, tx);
            })
        }));

        Ok(Self {
            peer,
            serial,
            peer_connection,
            channel: None,
            event_tx,
        })
    }

    pub fn peer(&self) -> &PlayerId {
        &self.peer
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Opens the `gameData` channel and produces the local offer.
    pub async fn create_offer(&self) -> Result<SessionDescription> {
        let dc = self
            .peer_connection
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await?;
        wire_channel(&dc, self.peer.clone(), self.serial, self.event_tx.clone());

        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    pub async fn apply_answer(&self, answer: &SessionDescription) -> Result<()> {
        let desc = RTCSessionDescription::answer(answer.sdp.clone())?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    /// Applies a remote offer and returns the answer already set locally.
    pub async fn accept_offer(&self, offer: &SessionDescription) -> Result<SessionDescription> {
        let desc = RTCSessionDescription::offer(offer.sdp.clone())?;
        self.peer_connection.set_remote_description(desc).await?;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    pub async fn add_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    pub fn set_channel(&mut self, channel: Arc<RTCDataChannel>) {
        self.channel = Some(channel);
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Sends on the data channel. Returns `false` when it is not open yet.
    pub async fn send_text(&self, text: &str) -> Result<bool> {
        let Some(channel) = &self.channel else {
            return Ok(false);
        };
        channel.send_text(text.to_owned()).await?;
        Ok(true)
    }

    pub async fn close(&self) -> Result<()> {
        if let Some(channel) = &self.channel {
            channel.close().await?;
        }
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn wire_channel(
    dc: &Arc<RTCDataChannel>,
    peer: PlayerId,
    serial: u64,
    tx: mpsc::UnboundedSender<LinkEvent>,
) {
    let open_dc = dc.clone();
    let open_tx = tx.clone();
    let open_peer = peer.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let peer = open_peer.clone();
        let channel = open_dc.clone();

        Box::pin(async move {
            info!("Data channel with {} is open", peer);
            let _ = tx.send(LinkEvent {
                peer,
                serial,
                kind: LinkEventKind::ChannelReady(channel),
            });
        })
    }));

    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        let peer = peer.clone();
        Box::pin(async move {
            let text = String::from_utf8_lossy(&msg.data).into_owned();
            let _ = tx.send(LinkEvent {
                peer,
                serial,
                kind: LinkEventKind::Message(text),
            });
        })
    }));
}

/// `Disconnected` can recover on its own once ICE checks succeed again.
fn is_terminal(state: RTCPeerConnectionState) -> bool {
    matches!(
        state,
        RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
    )
}

fn to_rtc_candidate(candidate: &IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate.clone(),
        sdp_mid: candidate.sdp_mid.clone(),
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment.clone(),
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
