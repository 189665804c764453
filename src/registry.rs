//! Owns the PortalKey/RoomID → Portal mapping (spec §4.1). The cache lock is
//! held only for map maintenance and the storage read-through on miss, never
//! across event handling (spec §5).

use crate::bridge::Bridge;
use crate::ids::{PortalKey, RoomId};
use crate::model::Portal;
use crate::portal::PortalActor;
use crate::storage::PortalStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Indexes {
    by_key: HashMap<PortalKey, Arc<PortalActor>>,
    by_room_id: HashMap<RoomId, PortalKey>,
}

pub struct PortalRegistry {
    store: Arc<dyn PortalStore>,
    cache: Mutex<Indexes>,
}

impl PortalRegistry {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        PortalRegistry {
            store,
            cache: Mutex::new(Indexes::default()),
        }
    }

    /// Spec §4.1: load from cache, else storage, else (if `create_if_missing`)
    /// insert a new row; resolve the parent chain recursively along the way.
    pub async fn get_by_key(
        &self,
        bridge: &Arc<Bridge>,
        key: &PortalKey,
        create_if_missing: bool,
    ) -> Result<Option<Arc<PortalActor>>> {
        let mut cache = self.cache.lock().await;

        if let Some(actor) = cache.by_key.get(key) {
            return Ok(Some(actor.clone()));
        }

        let existing = self.store.get_by_key(key).await?;
        let portal_data = match existing {
            Some(p) => p,
            None if create_if_missing => {
                let p = Portal::new(key.clone());
                self.store.insert(&p).await?;
                p
            }
            None => return Ok(None),
        };

        if let Some(parent_key) = portal_data.parent_key.clone()
            && !cache.by_key.contains_key(&parent_key)
        {
            drop(cache);
            Box::pin(self.get_by_key(bridge, &parent_key, false)).await?;
            cache = self.cache.lock().await;
        }

        let actor = crate::portal::spawn(bridge.clone(), portal_data.clone(), bridge.config.queue_capacity);
        cache.by_key.insert(key.clone(), actor.clone());
        if let Some(room_id) = portal_data.room_id {
            cache.by_room_id.insert(room_id, key.clone());
        }

        Ok(Some(actor))
    }

    pub async fn get_by_room_id(&self, bridge: &Arc<Bridge>, room_id: &RoomId) -> Result<Option<Arc<PortalActor>>> {
        {
            let cache = self.cache.lock().await;
            if let Some(key) = cache.by_room_id.get(room_id) {
                return Ok(cache.by_key.get(key).cloned());
            }
        }

        let Some(portal_data) = self.store.get_by_room_id(room_id).await? else {
            return Ok(None);
        };
        self.get_by_key(bridge, &portal_data.key, false).await
    }

    /// Spec §4.1 `get_existing_by_key`: exact key, then receiver-less form,
    /// then `get_by_id_with_uncertain_receiver`.
    pub async fn get_existing_by_key(&self, bridge: &Arc<Bridge>, key: &PortalKey) -> Result<Option<Arc<PortalActor>>> {
        if let Some(actor) = self.get_by_key(bridge, key, false).await? {
            return Ok(Some(actor));
        }
        if key.is_split()
            && let Some(actor) = self.get_by_key(bridge, &key.receiverless(), false).await?
        {
            return Ok(Some(actor));
        }
        let Some(portal_data) = self.store.get_by_id_with_uncertain_receiver(&key.chat_id).await? else {
            return Ok(None);
        };
        self.get_by_key(bridge, &portal_data.key, false).await
    }

    /// Indexes a newly-created room id (spec §4.7 create_matrix_room: "store
    /// RoomID ... reindex in registry").
    pub async fn reindex_room_id(&self, key: &PortalKey, room_id: RoomId) {
        let mut cache = self.cache.lock().await;
        cache.by_room_id.insert(room_id, key.clone());
    }

    pub async fn delete(&self, actor: &Arc<PortalActor>) -> Result<()> {
        let key = actor.key.clone();
        let room_id = actor.room_id();
        self.store.delete(&key).await?;

        let mut cache = self.cache.lock().await;
        cache.by_key.remove(&key);
        if let Some(room_id) = room_id {
            cache.by_room_id.remove(&room_id);
        }
        Ok(())
    }
}
