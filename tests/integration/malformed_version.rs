//! A frame with an unsupported version byte is a protocol
//! error. The gateway's reader task must tear the client down, and the
//! registry must no longer answer for its subdomain afterward.

#[path = "common/mod.rs"]
mod common;

use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[tokio::test]
async fn malformed_version_byte_tears_down_the_client() {
    let gateway = common::start_gateway().await;
    let (mut fake_client, subdomain) = common::connect_fake_client(gateway.control_addr).await;
    assert!(gateway.registry.get(&subdomain).await.is_some());

    // Hand-assemble a frame with version=99, bypassing the codec (which
    // would never let an encoder produce this on purpose).
    let mut bad_frame = Vec::new();
    bad_frame.push(99u8); // version
    bad_frame.push(2u8); // type = HEARTBEAT, otherwise valid
    bad_frame.extend_from_slice(Uuid::new_v4().as_bytes());
    bad_frame.extend_from_slice(&0u64.to_be_bytes()); // body len = 0

    fake_client.get_mut().write_all(&bad_frame).await.unwrap();

    wait_until_subdomain_gone(&gateway.registry, &subdomain).await;
}

async fn wait_until_subdomain_gone(registry: &gateway::registry::ClientRegistry, subdomain: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if registry.get(subdomain).await.is_none() {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "client was never torn down");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
