//! A client connects, the gateway hands back a subdomain, and a public
//! request round-trips through the tunnel to a simulated origin and back.

#[path = "common/mod.rs"]
mod common;

use futures_util::{SinkExt, StreamExt};
use http::{HeaderMap, StatusCode};
use tunnel_protocol::http_message::{self, DecodedRequest};
use tunnel_protocol::{Frame, FrameType};

#[tokio::test]
async fn public_request_round_trips_through_the_tunnel() {
    let gateway = common::start_gateway().await;
    let (mut fake_client, subdomain) = common::connect_fake_client(gateway.control_addr).await;

    let serve_once = tokio::spawn(async move {
        let request_frame = fake_client.next().await.unwrap().unwrap();
        assert_eq!(request_frame.frame_type, FrameType::Request);

        let DecodedRequest { path_and_query, .. } = http_message::decode_request(&request_frame.body).unwrap();
        assert_eq!(path_and_query, "/hi");

        let response_bytes = http_message::encode_response(StatusCode::OK, &HeaderMap::new(), b"pong");
        fake_client
            .send(Frame::new(FrameType::Response, request_frame.correlation_id, response_bytes))
            .await
            .unwrap();
        fake_client
    });

    let client = reqwest::Client::new();
    let response = client
        .get(common::public_url(gateway.http_addr, "/hi"))
        .header("host", common::host_header(&subdomain))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "pong");

    serve_once.await.unwrap();
}
