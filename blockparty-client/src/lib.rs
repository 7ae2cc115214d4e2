//! Native game client: joins a room on the relay, negotiates direct data
//! channels with the other players and keeps a roster of their boards.

mod config;
mod error;
mod session;
mod transport;

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{BroadcastGuard, PeerStateHandler, RosterHandler, Session, SessionHandlers};
pub use transport::{LinkEvent, LinkEventKind, PeerLink};
