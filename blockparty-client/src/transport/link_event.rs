use blockparty_core::{IceCandidate, PlayerId};
use std::sync::Arc;
use webrtc::data_channel::RTCDataChannel;

/// Something a `PeerLink` reported from inside a webrtc callback.
///
/// `serial` identifies the link that produced the event, so events from a
/// connection that has since been replaced can be told apart and dropped.
pub struct LinkEvent {
    pub peer: PlayerId,
    pub serial: u64,
    pub kind: LinkEventKind,
}

pub enum LinkEventKind {
    CandidateGenerated(IceCandidate),
    ChannelReady(Arc<RTCDataChannel>),
    Message(String),
    Disconnected,
}
