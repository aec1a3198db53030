//! The tunnel client's library surface: connects to a gateway's control
//! listener, relays inbound REQUEST frames to a local loopback origin,
//! and keeps the connection alive with a heartbeat.

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod relay;
pub mod tunnel;
