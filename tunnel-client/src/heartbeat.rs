//! Liveness traffic for an otherwise-idle control connection.
//!
//! The gateway only detects a dead client via read-deadline expiry (30s,
//! see `gateway::control`), so an idle client must keep producing inbound
//! bytes. A ticker fires every 5s and transmits HEARTBEAT unless paused.
//!
//! Pausing is level-triggered via `tokio::sync::watch<bool>`: the decode
//! loop sets the flag immediately before it starts handling any inbound
//! frame and clears it immediately after, so a HEARTBEAT can never be
//! queued in the middle of another frame's handling. Because
//! `watch` is last-value-wins rather than a queue of edges, a `pause`
//! immediately followed by a `resume` can never leave the ticker stuck.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;
use tunnel_protocol::{Frame, FrameType};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Handle held by the decode loop to pause/resume the heartbeat ticker.
#[derive(Clone)]
pub struct HeartbeatControl {
    paused: watch::Sender<bool>,
}

impl HeartbeatControl {
    pub fn pause(&self) {
        let _ = self.paused.send(true);
    }

    pub fn resume(&self) {
        let _ = self.paused.send(false);
    }
}

/// Spawn the heartbeat ticker task, returning the control handle used to
/// pause/resume it around inbound frame handling.
pub fn spawn(outbound: mpsc::UnboundedSender<Frame>) -> HeartbeatControl {
    let (paused_tx, mut paused_rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if *paused_rx.borrow_and_update() {
                continue;
            }
            let frame = Frame::empty(FrameType::Heartbeat, Uuid::new_v4());
            if outbound.send(frame).is_err() {
                debug!("heartbeat ticker exiting: control connection gone");
                return;
            }
        }
    });
    HeartbeatControl { paused: paused_tx }
}
