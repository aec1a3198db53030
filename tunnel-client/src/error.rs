use std::io;
use std::time::Duration;

/// Fatal to the whole tunnel session: the control connection could not be
/// established or could not be kept alive.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to gateway at {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("control connection closed by gateway")]
    ConnectionClosed,
    #[error(transparent)]
    Protocol(#[from] tunnel_protocol::ProtocolError),
}

/// Scoped to a single REQUEST: reported back to the gateway as an ERROR
/// frame rather than tearing down the control connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("malformed request from gateway: {0}")]
    Decode(#[from] tunnel_protocol::http_message::HttpMessageError),
    #[error("origin call failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("origin did not respond within {0:?}")]
    Timeout(Duration),
}

impl RelayError {
    /// The short human-readable diagnostic an ERROR frame's body carries.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
