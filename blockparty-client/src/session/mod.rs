mod broadcast;
mod handlers;
mod link_status;
mod session;
mod session_command;
mod session_loop;

pub use broadcast::BroadcastGuard;
pub use handlers::{PeerStateHandler, RosterHandler, SessionHandlers};
pub use session::Session;
