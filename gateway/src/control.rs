//! The control-plane accept loop, and the per-client reader/writer tasks
//! it spawns.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{info, warn};
use tunnel_protocol::{Frame, FrameCodec, FrameType};

use crate::client::{connection_accepted_frame, heartbeat_ok_frame, ClientHandle, WaiterOutcome};
use crate::registry::{generate_subdomain, ClientRegistry};

/// Heartbeat cadence is 5s; this tolerates up to five missed beats plus
/// jitter before declaring the client dead.
const READ_DEADLINE: Duration = Duration::from_secs(30);

/// Bind the control listener and accept tunnel clients forever.
pub async fn run_control_listener(addr: SocketAddr, registry: ClientRegistry) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "control listener bound");
    serve(listener, registry).await
}

/// Accept tunnel clients forever on an already-bound listener. Split out
/// from [`run_control_listener`] so integration tests can bind an
/// ephemeral port, read back its address, and only then hand the
/// listener off to the accept loop.
pub async fn serve(listener: TcpListener, registry: ClientRegistry) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = registry.clone();
        tokio::spawn(async move {
            accept_client(stream, peer, registry).await;
        });
    }
}

async fn accept_client(stream: TcpStream, peer: SocketAddr, registry: ClientRegistry) {
    let _ = stream.set_nodelay(true);
    let framed = Framed::new(stream, FrameCodec);
    let (writer_half, reader_half) = framed.split();

    let subdomain = generate_subdomain();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Frame>();
    let client = Arc::new(ClientHandle::new(subdomain.clone(), outbound_tx));

    registry.insert(client.clone()).await;
    info!(%peer, %subdomain, "tunnel client connected");

    // Queued before the writer task is even polled for the first time,
    // so FIFO ordering on the channel guarantees CONNECTION_ACCEPTED is
    // written before any REQUEST this client's subdomain could trigger.
    if client.send_frame(connection_accepted_frame(&subdomain)).is_err() {
        warn!(%subdomain, "failed to queue CONNECTION_ACCEPTED; client gone already");
        registry.remove(&subdomain).await;
        return;
    }

    tokio::spawn(run_writer(writer_half, outbound_rx, client.clone(), registry.clone()));
    run_reader(reader_half, client, registry).await;
}

async fn run_writer(
    mut sink: impl futures_util::Sink<Frame, Error = tunnel_protocol::ProtocolError> + Unpin,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
    client: Arc<ClientHandle>,
    registry: ClientRegistry,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(err) = sink.send(frame).await {
            warn!(subdomain = %client.subdomain, %err, "write failure; tearing down client");
            teardown(&client, &registry).await;
            return;
        }
    }
    // Channel closed: the client record was torn down elsewhere and
    // every sender (reader task, HTTP waiters) has been dropped.
}

async fn run_reader(
    mut stream: impl futures_util::Stream<Item = Result<Frame, tunnel_protocol::ProtocolError>> + Unpin,
    client: Arc<ClientHandle>,
    registry: ClientRegistry,
) {
    loop {
        match tokio::time::timeout(READ_DEADLINE, stream.next()).await {
            Ok(Some(Ok(frame))) => {
                if !dispatch(frame, &client).await {
                    break;
                }
            }
            Ok(Some(Err(err))) => {
                warn!(subdomain = %client.subdomain, %err, "protocol error decoding frame");
                break;
            }
            Ok(None) => {
                info!(subdomain = %client.subdomain, "control connection closed by peer");
                break;
            }
            Err(_elapsed) => {
                warn!(subdomain = %client.subdomain, "read deadline expired");
                break;
            }
        }
    }
    teardown(&client, &registry).await;
}

/// Returns `false` when the reader loop should stop (DISCONNECT, or the
/// caller already broke out for a transport/protocol reason).
async fn dispatch(frame: Frame, client: &ClientHandle) -> bool {
    match frame.frame_type {
        FrameType::Response => {
            client.deliver(frame.correlation_id, WaiterOutcome::Response(frame.body)).await;
            true
        }
        FrameType::Error => {
            client.deliver(frame.correlation_id, WaiterOutcome::Error(frame.body)).await;
            true
        }
        FrameType::Heartbeat => {
            let _ = client.send_frame(heartbeat_ok_frame());
            true
        }
        FrameType::Disconnect => false,
        // REQUEST, CONNECTION_REQUEST, CONNECTION_ACCEPTED, HEARTBEAT_OK
        // are forbidden on this direction; treated as no-ops for forward
        // compatibility.
        _ => true,
    }
}

/// Idempotent: safe to call from both the reader task (decode error,
/// deadline, DISCONNECT) and the writer task (write failure) without
/// coordination. `CancellationToken::cancel` and `HashMap::remove` are
/// both no-ops the second time.
async fn teardown(client: &Arc<ClientHandle>, registry: &ClientRegistry) {
    client.cancel();
    registry.remove(&client.subdomain).await;
}
