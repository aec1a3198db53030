//! No head-of-line blocking: two concurrent
//! public requests on the same tunnel, answered by the client in the
//! reverse of their arrival order, must each resolve to their own
//! matching body.

#[path = "common/mod.rs"]
mod common;

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use http::{HeaderMap, StatusCode};
use tunnel_protocol::http_message::{self, DecodedRequest};
use tunnel_protocol::{Frame, FrameType};

#[tokio::test]
async fn responses_are_matched_by_correlation_id_regardless_of_answer_order() {
    let gateway = common::start_gateway().await;
    let (mut fake_client, subdomain) = common::connect_fake_client(gateway.control_addr).await;

    let caller_a = spawn_caller(gateway.http_addr, &subdomain, "/a");
    let caller_b = spawn_caller(gateway.http_addr, &subdomain, "/b");

    // Collect both REQUEST frames, remembering which path each
    // correlation id belongs to.
    let mut path_by_id = HashMap::new();
    for _ in 0..2 {
        let frame = tokio::time::timeout(Duration::from_secs(5), fake_client.next())
            .await
            .expect("both requests should arrive promptly")
            .unwrap()
            .unwrap();
        assert_eq!(frame.frame_type, FrameType::Request);
        let DecodedRequest { path_and_query, .. } = http_message::decode_request(&frame.body).unwrap();
        path_by_id.insert(frame.correlation_id, path_and_query);
    }

    // Answer in an order that does not match arrival: whichever id we
    // saw second is answered first.
    let mut ids: Vec<_> = path_by_id.keys().copied().collect();
    ids.reverse();
    for id in ids {
        let path = &path_by_id[&id];
        let body = format!("response for {path}");
        let response_bytes = http_message::encode_response(StatusCode::OK, &HeaderMap::new(), body.as_bytes());
        fake_client.send(Frame::new(FrameType::Response, id, response_bytes)).await.unwrap();
    }

    let (response_a, response_b) = tokio::join!(caller_a, caller_b);
    assert_eq!(response_a.unwrap().text().await.unwrap(), "response for /a");
    assert_eq!(response_b.unwrap().text().await.unwrap(), "response for /b");
}

fn spawn_caller(
    http_addr: std::net::SocketAddr,
    subdomain: &str,
    path: &str,
) -> tokio::task::JoinHandle<reqwest::Response> {
    let url = common::public_url(http_addr, path);
    let host = common::host_header(subdomain);
    tokio::spawn(async move { reqwest::Client::new().get(url).header("host", host).send().await.unwrap() })
}
