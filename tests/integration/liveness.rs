//! A client that keeps sending HEARTBEAT every 5s stays
//! registered past the 30s read-deadline window that would otherwise
//! evict it, and a client that goes silent for longer than that window
//! is evicted.

#[path = "common/mod.rs"]
mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tunnel_protocol::{Frame, FrameType};
use uuid::Uuid;

#[tokio::test]
async fn heartbeats_keep_a_client_registered_past_the_read_deadline() {
    let gateway = common::start_gateway().await;
    let (mut fake_client, subdomain) = common::connect_fake_client(gateway.control_addr).await;

    // Tick heartbeats through two full read-deadline windows; an idle
    // client would have been evicted well before this.
    for _ in 0..13 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        fake_client
            .send(Frame::empty(FrameType::Heartbeat, Uuid::new_v4()))
            .await
            .unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(5), fake_client.next())
            .await
            .expect("HEARTBEAT_OK should arrive promptly")
            .unwrap()
            .unwrap();
        assert_eq!(reply.frame_type, FrameType::HeartbeatOk);
    }

    assert!(gateway.registry.get(&subdomain).await.is_some());
}

#[tokio::test]
async fn a_silent_client_is_evicted_after_the_read_deadline() {
    let gateway = common::start_gateway().await;
    let (fake_client, subdomain) = common::connect_fake_client(gateway.control_addr).await;

    // Neither send nor read anything: just hold the socket open and let
    // the gateway's 30s read deadline expire.
    tokio::time::sleep(Duration::from_secs(32)).await;
    drop(fake_client);

    // The reader task's own teardown races this assertion by at most one
    // scheduler tick; give it a moment to land.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.registry.get(&subdomain).await.is_none());
}
