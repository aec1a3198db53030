//! Shared scaffolding for the end-to-end integration suites: spins up a
//! real gateway (control listener + public HTTP listener) on loopback
//! ephemeral ports, and drives a hand-rolled "fake client" directly
//! against the wire protocol so each suite can script exactly the frame
//! sequence its scenario needs.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use gateway::registry::ClientRegistry;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tunnel_protocol::{Frame, FrameCodec, FrameType};
use uuid::Uuid;

#[allow(dead_code)]
pub struct TestGateway {
    pub control_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub registry: ClientRegistry,
}

/// Boot a gateway with both listeners bound to `127.0.0.1:0` and the
/// accept loops running in the background for the lifetime of the test
/// process (suites are short-lived processes, so nothing ever joins
/// these tasks).
#[allow(dead_code)]
pub async fn start_gateway() -> TestGateway {
    let registry = ClientRegistry::new();

    let control_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_addr = control_listener.local_addr().unwrap();
    tokio::spawn(gateway::control::serve(control_listener, registry.clone()));

    let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_addr = http_listener.local_addr().unwrap();
    let router = gateway::build_router(registry.clone());
    tokio::spawn(async move {
        axum::serve(http_listener, router).await.unwrap();
    });

    TestGateway { control_addr, http_addr, registry }
}

pub type FakeClientStream = Framed<TcpStream, FrameCodec>;

/// Connect a bare TCP socket to the gateway's control listener, transmit
/// CONNECTION_REQUEST, and wait for the CONNECTION_ACCEPTED reply. This
/// deliberately bypasses the `tunnel-client` crate so each scenario can
/// script exactly the frames it wants, including malformed ones.
#[allow(dead_code)]
pub async fn connect_fake_client(control_addr: SocketAddr) -> (FakeClientStream, String) {
    let stream = TcpStream::connect(control_addr).await.unwrap();
    let mut framed = Framed::new(stream, FrameCodec);

    framed
        .send(Frame::empty(FrameType::ConnectionRequest, Uuid::new_v4()))
        .await
        .unwrap();

    let accepted = framed.next().await.unwrap().unwrap();
    assert_eq!(accepted.frame_type, FrameType::ConnectionAccepted);
    let subdomain = String::from_utf8(accepted.body.to_vec()).unwrap();
    (framed, subdomain)
}

/// Build a public request URL that lands on the gateway's loopback
/// address; the caller attaches the routing Host header separately
/// (`host_header`) since `*.localhost` names aren't resolvable in CI.
#[allow(dead_code)]
pub fn public_url(http_addr: SocketAddr, path: &str) -> String {
    format!("http://{http_addr}{path}")
}

#[allow(dead_code)]
pub fn host_header(subdomain: &str) -> String {
    format!("{subdomain}.localhost")
}
