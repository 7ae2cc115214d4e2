pub mod ws_client;

pub use mock_signaling::*;
pub use test_peer::*;
pub use ws_client::*;
