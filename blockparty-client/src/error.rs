use blockparty_core::ProtocolError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("relay at {url} is unreachable")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("relay did not acknowledge the join within {0:?}")]
    ConnectTimeout(Duration),

    #[error("relay closed the connection before the join was acknowledged")]
    Rejected,

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
