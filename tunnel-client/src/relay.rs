//! Relays one REQUEST frame to the private origin and reports back a
//! RESPONSE or ERROR frame carrying the same correlation id.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc;
use tracing::warn;
use tunnel_protocol::http_message::{self, DecodedRequest};
use tunnel_protocol::{Frame, FrameType};
use uuid::Uuid;

use crate::error::RelayError;

/// Upper bound on a single call to the private origin.
const UPSTREAM_DEADLINE: Duration = Duration::from_secs(10);

/// Default sentinel body for an ERROR frame whose failure carries no more
/// specific diagnostic: used by the caller in `tunnel.rs` when a relay
/// task panics before it can report its own typed [`RelayError`].
pub const GENERIC_ERROR_REASON: &str = "Something went wrong";

/// Handle one REQUEST frame end to end. Always produces exactly one
/// outbound frame (RESPONSE on success, ERROR on any failure), both
/// carrying `correlation_id` unchanged so the gateway can match it back
/// to the waiting public request.
pub async fn handle_request(
    correlation_id: Uuid,
    request_bytes: bytes::Bytes,
    http_client: Client,
    local_origin: String,
    outbound: mpsc::UnboundedSender<Frame>,
) {
    let outcome = relay(&request_bytes, &http_client, &local_origin).await;
    let frame = match outcome {
        Ok(response_bytes) => Frame::new(FrameType::Response, correlation_id, response_bytes),
        Err(err) => {
            warn!(%correlation_id, %err, "request relay failed");
            Frame::new(FrameType::Error, correlation_id, err.reason())
        }
    };
    let _ = outbound.send(frame);
}

async fn relay(request_bytes: &[u8], http_client: &Client, local_origin: &str) -> Result<bytes::Bytes, RelayError> {
    let DecodedRequest {
        method,
        path_and_query,
        headers,
        body,
    } = http_message::decode_request(request_bytes)?;

    let url = format!("{local_origin}{path_and_query}");
    let builder = http_client.request(method, &url).headers(headers).body(body.to_vec());

    let response = tokio::time::timeout(UPSTREAM_DEADLINE, builder.send())
        .await
        .map_err(|_| RelayError::Timeout(UPSTREAM_DEADLINE))??;

    let status = response.status();
    let response_headers = response.headers().clone();
    let body = response.bytes().await?;

    Ok(http_message::encode_response(status, &response_headers, &body))
}
