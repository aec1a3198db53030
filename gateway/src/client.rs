//! Per-client state: the record the registry keys by subdomain.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tunnel_protocol::{Frame, FrameType};
use uuid::Uuid;

/// What a RESPONSE or ERROR frame resolves a pending waiter to.
#[derive(Debug)]
pub enum WaiterOutcome {
    /// A RESPONSE frame's body: a complete HTTP/1.x response message.
    Response(Bytes),
    /// An ERROR frame's body: a short human-readable diagnostic.
    Error(Bytes),
}

type PendingTable = Mutex<HashMap<Uuid, oneshot::Sender<WaiterOutcome>>>;

/// A registered tunnel client: its outbound frame queue, its pending
/// request table, and the cancellation token that drives teardown.
pub struct ClientHandle {
    pub subdomain: String,
    outbound: mpsc::UnboundedSender<Frame>,
    pending: PendingTable,
    cancellation: CancellationToken,
}

impl ClientHandle {
    pub fn new(subdomain: String, outbound: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            subdomain,
            outbound,
            pending: Mutex::new(HashMap::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Install a pending-request slot for `correlation_id`. Must be
    /// called before the REQUEST frame carrying that id is transmitted,
    /// so the reader task can never observe a RESPONSE/ERROR for an id
    /// with no slot to deliver into.
    pub async fn register_pending(&self, correlation_id: Uuid) -> oneshot::Receiver<WaiterOutcome> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);
        rx
    }

    /// Remove a pending-request slot without delivering anything. Safe
    /// to call on every waiter exit path (the timeout/cancellation
    /// branches call this themselves; a branch that already delivered a
    /// value via [`Self::deliver`] finds nothing left to remove).
    pub async fn remove_pending(&self, correlation_id: &Uuid) {
        self.pending.lock().await.remove(correlation_id);
    }

    /// Non-blocking best-effort removal, for use from a `Drop` impl where
    /// `.await` isn't available: when the public HTTP caller disconnects,
    /// axum drops the handler future (including any in-progress
    /// `select!`) rather than waking a branch of it, so the waiter's
    /// cleanup has to happen synchronously. `try_lock` only fails here if
    /// the reader task is mid-delivery on the same id, in which case that
    /// delivery's own `remove` already wins the race.
    pub fn remove_pending_blocking(&self, correlation_id: &Uuid) {
        if let Ok(mut pending) = self.pending.try_lock() {
            pending.remove(correlation_id);
        }
    }

    /// Deliver a RESPONSE/ERROR outcome to its waiter, if one is still
    /// waiting. Non-blocking: a dropped receiver (waiter already gave
    /// up) just drops the value. At most one delivery is ever attempted
    /// per correlation id, since the slot is removed here on delivery.
    pub async fn deliver(&self, correlation_id: Uuid, outcome: WaiterOutcome) {
        if let Some(tx) = self.pending.lock().await.remove(&correlation_id) {
            let _ = tx.send(outcome);
        } else {
            warn!(subdomain = %self.subdomain, %correlation_id, "response for unknown or abandoned request");
        }
    }

    /// Queue a frame for the per-client writer task. Fails only once the
    /// client has been torn down and its writer task has exited.
    pub fn send_frame(&self, frame: Frame) -> Result<(), Frame> {
        self.outbound.send(frame).map_err(|e| e.0)
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Fire the cancellation token, waking every pending waiter with
    /// [`WaiterOutcome`]-independent signal: waiters observe the token,
    /// not a channel closure, so no send-on-closed race is possible
    /// here (see module docs on teardown in `control.rs`).
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

pub fn heartbeat_ok_frame() -> Frame {
    Frame::empty(FrameType::HeartbeatOk, Uuid::new_v4())
}

pub fn connection_accepted_frame(subdomain: &str) -> Frame {
    Frame::new(
        FrameType::ConnectionAccepted,
        Uuid::new_v4(),
        Bytes::copy_from_slice(subdomain.as_bytes()),
    )
}
