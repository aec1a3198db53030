//! The client's control-plane loop: one TCP connection to the gateway,
//! a dedicated writer task, a heartbeat ticker, and a decode loop that
//! spawns one relay task per inbound REQUEST.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};
use tunnel_protocol::{Frame, FrameCodec, FrameType};
use uuid::Uuid;

use crate::config::TunnelConfig;
use crate::error::ClientError;
use crate::heartbeat;
use crate::relay;

/// Connect to the gateway and run the tunnel until the control
/// connection is lost. Returns once the connection ends; callers decide
/// whether to retry. No reconnection or subdomain persistence is
/// attempted here — the reference behaviour is simply to exit.
pub async fn run(config: TunnelConfig) -> Result<(), ClientError> {
    let addr = config.gateway_addr();
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect { addr: addr.clone(), source })?;
    let _ = stream.set_nodelay(true);
    info!(%addr, "connected to gateway");

    let framed = Framed::new(stream, FrameCodec);
    let (mut sink, mut stream) = framed.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(err) = sink.send(frame).await {
                warn!(%err, "write failure on control connection");
                return;
            }
        }
    });

    outbound_tx
        .send(Frame::empty(FrameType::ConnectionRequest, Uuid::new_v4()))
        .expect("writer task not dropped yet");

    let heartbeat = heartbeat::spawn(outbound_tx.clone());
    let http_client = Client::builder().build().expect("reqwest client build never fails here");
    let local_origin = Arc::new(config.local_origin());

    let mut subdomain: Option<String> = None;
    let result = loop {
        match stream.next().await {
            Some(Ok(frame)) => {
                heartbeat.pause();
                let outcome = dispatch(frame, &mut subdomain, &outbound_tx, &http_client, &local_origin);
                heartbeat.resume();
                if let Some(err) = outcome {
                    break Err(err);
                }
            }
            Some(Err(err)) => break Err(ClientError::Protocol(err)),
            None => break Err(ClientError::ConnectionClosed),
        }
    };

    drop(outbound_tx);
    let _ = writer.await;
    result
}

/// Returns `Some(err)` when the loop should stop; `None` to keep going.
/// The caller wraps every call in a heartbeat pause/resume pair so no
/// HEARTBEAT is ever queued mid-handling of another frame.
fn dispatch(
    frame: Frame,
    subdomain: &mut Option<String>,
    outbound: &mpsc::UnboundedSender<Frame>,
    http_client: &Client,
    local_origin: &Arc<String>,
) -> Option<ClientError> {
    match frame.frame_type {
        FrameType::ConnectionAccepted => {
            let assigned = String::from_utf8_lossy(&frame.body).into_owned();
            if subdomain.is_some() {
                warn!(%assigned, "received a second CONNECTION_ACCEPTED; ignoring");
            } else {
                info!(subdomain = %assigned, "tunnel established: http://{assigned}.localhost:8000");
                *subdomain = Some(assigned);
            }
            None
        }
        FrameType::Request => {
            let correlation_id = frame.correlation_id;
            let relay_outbound = outbound.clone();
            let fallback_outbound = outbound.clone();
            let http_client = http_client.clone();
            let local_origin = local_origin.as_ref().clone();
            let body = frame.body;
            tokio::spawn(async move {
                // `handle_request` always sends its own RESPONSE/ERROR frame
                // on every return path; the only way this can fail to
                // happen is the task itself panicking, in which case there
                // is no specific diagnostic left to report.
                let relay_task =
                    tokio::spawn(relay::handle_request(correlation_id, body, http_client, local_origin, relay_outbound));
                if relay_task.await.is_err() {
                    warn!(%correlation_id, "relay task panicked; reporting a generic error");
                    let _ = fallback_outbound.send(Frame::new(
                        FrameType::Error,
                        correlation_id,
                        relay::GENERIC_ERROR_REASON,
                    ));
                }
            });
            None
        }
        FrameType::HeartbeatOk => None,
        FrameType::Error => {
            warn!(correlation_id = %frame.correlation_id, body = %String::from_utf8_lossy(&frame.body), "gateway sent ERROR");
            None
        }
        FrameType::Disconnect => {
            warn!("gateway sent DISCONNECT");
            None
        }
        // HEARTBEAT, CONNECTION_REQUEST: never sent by the gateway; no-op
        // for forward compatibility (mirrors the gateway's own handling
        // of out-of-direction frames).
        FrameType::Heartbeat | FrameType::ConnectionRequest => None,
        FrameType::Response => {
            error!("gateway sent RESPONSE, which only the client originates; ignoring");
            None
        }
    }
}
