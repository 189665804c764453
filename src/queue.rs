//! Per-portal bounded mailbox (spec §4.2). One `mpsc` channel per Portal, one
//! consumer task draining it for the Portal's whole lifetime — the single
//! serialization point invariant 5 relies on.

use crate::config::QueueOverflowPolicy;
use crate::ids::LoginId;
use crate::ids::LocalUserId;
use crate::remote_event::RemoteEvent;
use crate::room_event::RoomEvent;
use tokio::sync::mpsc;

/// One unit of work for a Portal's event loop (spec §4.2 `PortalEvent`).
pub enum PortalEvent {
    RoomSide {
        user: LocalUserId,
        event: RoomEvent,
    },
    NetworkSide {
        login: LoginId,
        event: RemoteEvent,
    },
}

pub fn new_queue(capacity: usize) -> (mpsc::Sender<PortalEvent>, mpsc::Receiver<PortalEvent>) {
    mpsc::channel(capacity.max(1))
}

/// Enqueue according to the configured overflow policy (spec §5 Back-pressure).
/// `Drop` rejects immediately and logs; `Block` awaits capacity.
pub async fn enqueue(sender: &mpsc::Sender<PortalEvent>, policy: QueueOverflowPolicy, event: PortalEvent) {
    match policy {
        QueueOverflowPolicy::Block => {
            if sender.send(event).await.is_err() {
                tracing::error!("portal event queue closed, event lost");
            }
        }
        QueueOverflowPolicy::Drop => {
            if let Err(err) = sender.try_send(event) {
                tracing::error!(%err, "portal event queue full, dropping event");
            }
        }
    }
}
