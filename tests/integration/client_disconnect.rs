//! The client's control connection drops while a public
//! request is in flight. The waiter must observe the cancellation and
//! surface 503 within one cancellation cycle, without ever hanging.

#[path = "common/mod.rs"]
mod common;

use futures_util::StreamExt;
use std::time::Duration;
use tunnel_protocol::FrameType;

#[tokio::test]
async fn client_disconnect_mid_request_yields_503() {
    let gateway = common::start_gateway().await;
    let (mut fake_client, subdomain) = common::connect_fake_client(gateway.control_addr).await;

    let caller = tokio::spawn({
        let url = common::public_url(gateway.http_addr, "/slow");
        let host = common::host_header(&subdomain);
        async move {
            reqwest::Client::new()
                .get(url)
                .header("host", host)
                .send()
                .await
                .unwrap()
        }
    });

    // Wait for the REQUEST frame to actually arrive before severing the
    // connection, so the waiter is genuinely in flight rather than just
    // scheduled.
    let request_frame = tokio::time::timeout(Duration::from_secs(5), fake_client.next())
        .await
        .expect("gateway should forward the request promptly")
        .unwrap()
        .unwrap();
    assert_eq!(request_frame.frame_type, FrameType::Request);

    drop(fake_client);

    let response = tokio::time::timeout(Duration::from_secs(5), caller)
        .await
        .expect("caller should observe the disconnect promptly")
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "Client disconnected");
}
