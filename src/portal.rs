//! The in-memory Portal object (spec glossary, §9 Ownership): owns its typing
//! state, room-creation lock, and event queue handle; runs exactly one
//! consumer task for its lifetime. Named `PortalActor` here to keep it
//! distinct from [`crate::model::Portal`], the persisted data row it wraps.

use crate::bridge::Bridge;
use crate::ids::{PortalKey, RoomId};
use crate::model::Portal;
use crate::queue::{self, PortalEvent};
use crate::typing::TypingState;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::Instrument;

pub struct PortalActor {
    pub key: PortalKey,
    data: StdMutex<Portal>,
    sender: mpsc::Sender<PortalEvent>,
    pub typing: TypingState,
    pub room_create_lock: AsyncMutex<()>,
}

impl PortalActor {
    pub fn snapshot(&self) -> Portal {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut Portal)) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut data);
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).room_id.clone()
    }

    pub fn sender(&self) -> mpsc::Sender<PortalEvent> {
        self.sender.clone()
    }
}

/// Starts the Portal's event loop (spec §4.2, §9: "the natural shape is
/// `tokio::spawn(event_loop(portal))` + a bounded mpsc channel").
pub fn spawn(bridge: Arc<Bridge>, portal_data: Portal, capacity: usize) -> Arc<PortalActor> {
    let (sender, receiver) = queue::new_queue(capacity);
    let actor = Arc::new(PortalActor {
        key: portal_data.key.clone(),
        data: StdMutex::new(portal_data),
        sender,
        typing: TypingState::default(),
        room_create_lock: AsyncMutex::new(()),
    });

    let loop_actor = actor.clone();
    let span = tracing::info_span!("portal", key = %actor.key);
    tokio::spawn(event_loop(bridge, loop_actor, receiver).instrument(span));

    actor
}

async fn event_loop(bridge: Arc<Bridge>, actor: Arc<PortalActor>, mut receiver: mpsc::Receiver<PortalEvent>) {
    while let Some(event) = receiver.recv().await {
        match event {
            PortalEvent::RoomSide { user, event } => {
                if let Err(err) = crate::room_handler::handle_room_event(&bridge, &actor, &user, event).await {
                    tracing::error!(%err, "room-side event handling failed");
                }
            }
            PortalEvent::NetworkSide { login: login_id, event } => {
                let Some(login) = bridge.login_cache.login_by_id(&login_id) else {
                    tracing::error!(login = %login_id, "network event referenced an unknown login");
                    continue;
                };
                if let Err(err) = crate::network_handler::handle_network_event(&bridge, &actor, &login, event).await {
                    tracing::error!(%err, "network-side event handling failed");
                }
            }
        }
    }
    tracing::debug!("portal event loop exiting, sender dropped");
}
