//! Transport independent half of the client: what to do with each signaling
//! event, leaving the actual sockets and peer connections to the caller.

mod clock;
mod identity;
mod negotiation;
mod peer_table;
mod roster;

pub use clock::StateClock;
pub use identity::Identity;
pub use negotiation::{
    CandidateDisposition, Negotiation, NegotiationError, NegotiationState, Role,
};
pub use peer_table::{PeerAction, PeerTable};
pub use roster::{PeerView, Roster, RosterDiff, StartEligibility, StateUpdate};
