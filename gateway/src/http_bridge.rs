//! The public HTTP listener's single entry point: an axum fallback
//! handler matching any method/path/host, bridging one inbound request
//! through the owning tunnel client's control connection and back.

use std::time::Duration;

use axum::body::Bytes as BodyBytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};
use tunnel_protocol::http_message::{self, DecodedResponse};
use tunnel_protocol::{Frame, FrameType};
use uuid::Uuid;

use crate::client::{ClientHandle, WaiterOutcome};
use crate::error::GatewayError;
use crate::registry::ClientRegistry;

/// Upper bound on how long a public caller waits for a tunnel round
/// trip before the gateway gives up on its behalf.
const GATEWAY_DEADLINE: Duration = Duration::from_secs(30);

/// The sole fallback route mounted on the public router (see
/// [`crate::build_router`]).
pub async fn bridge(
    State(registry): State<ClientRegistry>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: BodyBytes,
) -> Response {
    match serve(&registry, method, uri, headers, body).await {
        Ok(response) => response,
        Err(err) => {
            warn!(%err, "request failed");
            err.into_response()
        }
    }
}

async fn serve(
    registry: &ClientRegistry,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: BodyBytes,
) -> Result<Response, GatewayError> {
    let subdomain = leading_host_label(&headers).ok_or(GatewayError::UnknownSubdomain)?;
    let client = registry.get(&subdomain).await.ok_or(GatewayError::UnknownSubdomain)?;

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let request_bytes = http_message::encode_request(&method, path_and_query, &headers, &body);

    let correlation_id = Uuid::new_v4();
    // Installed before the REQUEST frame is transmitted (invariant
    // I2/I3) and dropped on every exit path below, including the one
    // axum itself drives by dropping this whole future when the caller
    // hangs up mid-wait.
    let mut guard = PendingGuard::new(client.clone(), correlation_id);
    guard.rx = Some(client.register_pending(correlation_id).await);

    if client
        .send_frame(Frame::new(FrameType::Request, correlation_id, request_bytes))
        .is_err()
    {
        return Err(GatewayError::ClientDisconnected);
    }

    let response_rx = guard.rx.as_mut().expect("registered above");
    let cancellation = client.cancellation();

    // No `biased;`: when a response, a disconnect, and the deadline are
    // simultaneously ready, tokio's default pseudo-random selection
    // decides among them rather than a fixed top-to-bottom priority.
    let outcome = tokio::select! {
        result = response_rx => result.map_err(|_| GatewayError::ClientDisconnected),
        () = cancellation.cancelled() => Err(GatewayError::ClientDisconnected),
        () = tokio::time::sleep(GATEWAY_DEADLINE) => Err(GatewayError::GatewayTimeout),
    };

    info!(%subdomain, %correlation_id, "tunnel round trip complete");
    to_response(outcome?)
}

fn to_response(outcome: WaiterOutcome) -> Result<Response, GatewayError> {
    match outcome {
        WaiterOutcome::Response(bytes) => {
            let DecodedResponse { status, headers, body } =
                http_message::decode_response(&bytes).map_err(|_| GatewayError::ResponseDecode)?;
            let mut response = Response::builder().status(status);
            *response.headers_mut().expect("builder not yet finalized") = headers;
            response.body(axum::body::Body::from(body)).map_err(|_| GatewayError::ResponseDecode)
        }
        WaiterOutcome::Error(bytes) => {
            let reason = String::from_utf8_lossy(&bytes).into_owned();
            Err(GatewayError::ClientError(reason))
        }
    }
}

fn leading_host_label(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(axum::http::header::HOST)?.to_str().ok()?;
    let host = host.split(':').next().unwrap_or(host);
    host.split('.').next().map(str::to_owned)
}

/// Guarantees a pending-table entry is removed no matter which of the
/// waiter's four exit paths fires: a normal outcome removes it inline
/// via [`ClientHandle::remove_pending`] when `serve` returns, and `Drop`
/// covers the fourth path, where axum drops this future outright because
/// the caller's own connection closed (hyper surfaces a vanished peer by
/// cancelling the handler, not by waking a future inside it).
struct PendingGuard {
    client: std::sync::Arc<ClientHandle>,
    correlation_id: Uuid,
    rx: Option<tokio::sync::oneshot::Receiver<WaiterOutcome>>,
}

impl PendingGuard {
    fn new(client: std::sync::Arc<ClientHandle>, correlation_id: Uuid) -> Self {
        Self { client, correlation_id, rx: None }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.client.remove_pending_blocking(&self.correlation_id);
    }
}
