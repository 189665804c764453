//! Composition root (spec §4.9). Grounded on the teacher's `build_rocket`:
//! one shared value owning the registry and every collaborator handle, with
//! `start` attaching the background loops the teacher's `AdHoc::on_liftoff`
//! hooks model.

use crate::apis::{DisappearingSweeper, GhostApi, LoginCache, MatrixApi, NetworkApi};
use crate::config::BridgeConfig;
use crate::ids::{LocalUserId, LoginId, PortalKey};
use crate::queue::{self, PortalEvent};
use crate::registry::PortalRegistry;
use crate::remote_event::RemoteEvent;
use crate::room_event::RoomEvent;
use crate::storage::{MessageStore, PortalStore, ReactionStore, UserPortalStore};
use anyhow::{anyhow, Result};
use std::sync::Arc;

pub struct Bridge {
    pub config: BridgeConfig,
    pub registry: PortalRegistry,
    pub portal_store: Arc<dyn PortalStore>,
    pub message_store: Arc<dyn MessageStore>,
    pub reaction_store: Arc<dyn ReactionStore>,
    pub user_portal_store: Arc<dyn UserPortalStore>,
    pub matrix_api: Arc<dyn MatrixApi>,
    pub network_api: Arc<dyn NetworkApi>,
    pub ghost_api: Arc<dyn GhostApi>,
    pub login_cache: Arc<dyn LoginCache>,
    pub disappearing_sweeper: Option<Arc<dyn DisappearingSweeper>>,
}

#[allow(clippy::too_many_arguments)]
impl Bridge {
    /// Performs no I/O beyond what the passed-in storage handle already did
    /// opening itself; portals are not eagerly loaded (spec §3 Lifecycle).
    pub fn new(
        config: BridgeConfig,
        portal_store: Arc<dyn PortalStore>,
        message_store: Arc<dyn MessageStore>,
        reaction_store: Arc<dyn ReactionStore>,
        user_portal_store: Arc<dyn UserPortalStore>,
        matrix_api: Arc<dyn MatrixApi>,
        network_api: Arc<dyn NetworkApi>,
        ghost_api: Arc<dyn GhostApi>,
        login_cache: Arc<dyn LoginCache>,
        disappearing_sweeper: Option<Arc<dyn DisappearingSweeper>>,
    ) -> Arc<Bridge> {
        Arc::new(Bridge {
            registry: PortalRegistry::new(portal_store.clone()),
            config,
            portal_store,
            message_store,
            reaction_store,
            user_portal_store,
            matrix_api,
            network_api,
            ghost_api,
            login_cache,
            disappearing_sweeper,
        })
    }

    /// Spawns the ambient background loops (spec §4.9). The typing-refresh
    /// ticker is started per portal, lazily, on first typing activity (spec
    /// §9 decision 3) rather than eagerly here. Disappearing-message sweeping
    /// is driven entirely by the `DisappearingSweeper` collaborator's own
    /// `schedule`/`kick` calls (spec §1, §3); the core has nothing to tick.
    pub async fn start(self: &Arc<Self>) {
        tracing::info!("bridge starting");
    }

    /// Resolves (creating lazily if needed) the target Portal and enqueues a
    /// room-side event onto it (spec §4.9).
    pub async fn dispatch_room_event(self: &Arc<Self>, portal_key: &PortalKey, user: LocalUserId, event: RoomEvent) -> Result<()> {
        let actor = self
            .registry
            .get_by_key(self, portal_key, true)
            .await?
            .ok_or_else(|| anyhow!("failed to load or create portal {portal_key}"))?;
        queue::enqueue(&actor.sender(), self.config.queue_overflow, PortalEvent::RoomSide { user, event }).await;
        Ok(())
    }

    pub async fn dispatch_network_event(self: &Arc<Self>, portal_key: &PortalKey, login: LoginId, event: RemoteEvent) -> Result<()> {
        let actor = self
            .registry
            .get_by_key(self, portal_key, true)
            .await?
            .ok_or_else(|| anyhow!("failed to load or create portal {portal_key}"))?;
        queue::enqueue(&actor.sender(), self.config.queue_overflow, PortalEvent::NetworkSide { login, event }).await;
        Ok(())
    }

    /// Lazily spawns the per-portal typing refresher the first time a
    /// portal sees typing activity (spec §4.5, §9 decision 3).
    pub fn ensure_typing_refresher(self: &Arc<Self>, actor: &Arc<crate::portal::PortalActor>) {
        if !actor.typing.mark_refresher_spawned() {
            return;
        }
        let bridge = self.clone();
        let actor = actor.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(bridge.config.typing_refresh_interval);
            loop {
                interval.tick().await;
                for (_user, login_id) in actor.typing.currently_typing_logins() {
                    let Some(login) = bridge.login_cache.login_by_id(&login_id) else {
                        continue;
                    };
                    if let Err(err) = bridge.network_api.handle_typing(&actor.key, &login, true).await {
                        tracing::debug!(%err, "typing refresh send failed");
                    }
                }
            }
        });
    }
}
