//! The gateway binary's library surface: a control-plane listener that
//! accepts tunnel clients, a public HTTP router that bridges inbound
//! requests into them, and the shared state tying the two together.

pub mod client;
pub mod control;
pub mod error;
pub mod http_bridge;
pub mod registry;

use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::registry::ClientRegistry;

/// Build the public HTTP router: a single fallback route that matches
/// any method, path, and host, backed by the shared [`ClientRegistry`],
/// wrapped in a `tower-http` request-tracing layer, the same way other
/// axum services in this stack log inbound traffic.
pub fn build_router(registry: ClientRegistry) -> Router {
    Router::new()
        .fallback(any(http_bridge::bridge))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}
