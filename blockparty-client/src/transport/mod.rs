mod link_event;
mod peer_link;

pub use link_event::{LinkEvent, LinkEventKind};
pub use peer_link::PeerLink;
