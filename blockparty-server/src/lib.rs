mod config;
mod error;
mod room;
mod server;
mod signaling;

pub use config::RelayConfig;
pub use error::RelayError;
pub use room::*;
pub use server::{RelayServer, app};
pub use signaling::*;
