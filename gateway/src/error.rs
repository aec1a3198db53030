//! Error taxonomy for the gateway.
//!
//! Transport and protocol errors are handled where they occur (they tear
//! a client down directly, see [`crate::control`]); this module only
//! covers the per-request errors the HTTP waiter can produce, each of
//! which maps onto exactly one HTTP status code.
//!
//! There is deliberately no "request encode failure" variant: the inbound
//! request is turned into a REQUEST frame body by
//! [`tunnel_protocol::http_message::encode_request`], which writes a method,
//! request-target, and a `HeaderMap` whose names/values axum has already
//! validated as well-formed ASCII on the way in. That encode has no failure
//! case to report, so there is no call site that could ever produce such a
//! variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Outcome of a single public HTTP request that failed to complete
/// end-to-end through the tunnel.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No client is registered for the Host header's leading label.
    #[error("internal server error")]
    UnknownSubdomain,
    /// The client's RESPONSE frame body was not a well-formed HTTP/1.x
    /// response message.
    #[error("response decode failure")]
    ResponseDecode,
    /// The client sent an ERROR frame for this correlation id.
    #[error("{0}")]
    ClientError(String),
    /// The owning client's control connection was torn down while this
    /// request was in flight.
    #[error("Client disconnected")]
    ClientDisconnected,
    /// The original HTTP caller gave up before a response arrived.
    #[error("Request cancelled")]
    CallerCancelled,
    /// No response arrived within the 30s gateway deadline.
    #[error("Gateway timeout")]
    GatewayTimeout,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownSubdomain | Self::ResponseDecode | Self::ClientError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ClientDisconnected => StatusCode::SERVICE_UNAVAILABLE,
            Self::CallerCancelled => StatusCode::REQUEST_TIMEOUT,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, self.to_string()).into_response()
    }
}
