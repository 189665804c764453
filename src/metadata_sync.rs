//! Room name/topic/avatar sync, participant sync, and room creation
//! (spec §4.7).

use crate::apis::{ChatInfo, CreateRoomRequest, InitialStateEvent, MatrixApi, MatrixSendError, RoomMember, RoomPreset, RoomVisibility};
use crate::bridge::Bridge;
use crate::ids::{RoomEventId, RoomId, RoomUserId};
use crate::intent::Intent;
use crate::portal::PortalActor;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Bridge bot power level applied at room creation (spec §4.7: "bridge bot at 9001").
const BOT_POWER_LEVEL: i64 = 9001;
/// Canonical bridge-info state event type (MSC2346).
const BRIDGE_INFO_TYPE: &str = "m.bridge";
/// Legacy bridge-info state event type predating MSC2346 (spec §6: "half-shot legacy").
const BRIDGE_INFO_LEGACY_TYPE: &str = "uk.half-shot.bridge";
const FUNCTIONAL_MEMBERS_TYPE: &str = "io.element.functional_members";
const SPACE_PARENT_TYPE: &str = "m.space.parent";

/// Sends a state event acting as `sender`; on `Forbidden` retries as the bot
/// with a `fi.mau.bridge.set_by` extra naming the original sender
/// (spec §4.7 send_room_meta).
pub async fn send_room_meta(
    matrix_api: &Arc<dyn MatrixApi>,
    room_id: &RoomId,
    sender: &Intent,
    set_by: &str,
    event_type: &str,
    state_key: &str,
    content: serde_json::Value,
) -> Result<RoomEventId> {
    match matrix_api.send_state(room_id, sender, event_type, state_key, content.clone()).await {
        Ok(id) => Ok(id),
        Err(MatrixSendError::Forbidden) => {
            let mut retried = content;
            if let serde_json::Value::Object(ref mut map) = retried {
                map.insert("fi.mau.bridge.set_by".to_string(), serde_json::Value::String(set_by.to_string()));
            }
            matrix_api
                .send_state(room_id, &Intent::Bot, event_type, state_key, retried)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))
        }
        Err(MatrixSendError::Other(err)) => Err(err),
    }
}

/// Spec §4.7 update_name: idempotent, no-op when the stored value already
/// matches and the `NameSet` flag is true.
pub async fn update_name(bridge: &Bridge, actor: &PortalActor, intent: &Intent, set_by: &str, new_name: &str) -> Result<bool> {
    let portal = actor.snapshot();
    if portal.name == new_name && portal.name_set {
        return Ok(false);
    }
    let Some(room_id) = portal.room_id.clone() else {
        actor.update(|p| {
            p.name = new_name.to_string();
            p.name_set = false;
        });
        return Ok(true);
    };
    let content = serde_json::json!({ "name": new_name });
    let result = send_room_meta(&bridge.matrix_api, &room_id, intent, set_by, "m.room.name", "", content).await;
    if let Err(ref err) = result {
        tracing::warn!(%err, "failed to send room name update");
    }
    let set = result.is_ok();
    actor.update(|p| {
        p.name = new_name.to_string();
        p.name_set = set;
    });
    Ok(true)
}

/// Spec §4.7 update_topic: same idempotence rule as update_name.
pub async fn update_topic(bridge: &Bridge, actor: &PortalActor, intent: &Intent, set_by: &str, new_topic: &str) -> Result<bool> {
    let portal = actor.snapshot();
    if portal.topic == new_topic && portal.topic_set {
        return Ok(false);
    }
    let Some(room_id) = portal.room_id.clone() else {
        actor.update(|p| {
            p.topic = new_topic.to_string();
            p.topic_set = false;
        });
        return Ok(true);
    };
    let content = serde_json::json!({ "topic": new_topic });
    let result = send_room_meta(&bridge.matrix_api, &room_id, intent, set_by, "m.room.topic", "", content).await;
    if let Err(ref err) = result {
        tracing::warn!(%err, "failed to send room topic update");
    }
    let set = result.is_ok();
    actor.update(|p| {
        p.topic = new_topic.to_string();
        p.topic_set = set;
    });
    Ok(true)
}

/// Spec §4.7 update_avatar, including §9 decision 4 / S8: a failed reupload
/// still reports `changed = true` while leaving `avatar_set = false`.
pub async fn update_avatar(
    bridge: &Bridge,
    actor: &PortalActor,
    intent: &Intent,
    set_by: &str,
    new_avatar_id: &str,
    remove: bool,
) -> Result<bool> {
    let portal = actor.snapshot();
    if !remove && portal.avatar_id == new_avatar_id && portal.avatar_set {
        return Ok(false);
    }

    let Some(room_id) = portal.room_id.clone() else {
        actor.update(|p| {
            if remove {
                p.avatar_id.clear();
                p.avatar_url = None;
                p.avatar_content_hash = None;
            } else {
                p.avatar_id = new_avatar_id.to_string();
            }
            p.avatar_set = false;
        });
        return Ok(true);
    };

    if remove {
        let result = send_room_meta(&bridge.matrix_api, &room_id, intent, set_by, "m.room.avatar", "", serde_json::json!({})).await;
        let set = result.is_ok();
        actor.update(|p| {
            p.avatar_id.clear();
            p.avatar_url = None;
            p.avatar_content_hash = None;
            p.avatar_set = set;
        });
        return Ok(true);
    }

    match bridge.matrix_api.reupload(intent, new_avatar_id, portal.avatar_content_hash).await {
        Ok((hash, url)) => {
            if Some(hash) == portal.avatar_content_hash {
                actor.update(|p| {
                    p.avatar_id = new_avatar_id.to_string();
                    p.avatar_set = true;
                });
                return Ok(true);
            }
            let set = if let Some(url) = url.clone() {
                let content = serde_json::json!({ "url": url });
                let result = send_room_meta(&bridge.matrix_api, &room_id, intent, set_by, "m.room.avatar", "", content).await;
                if let Err(ref err) = result {
                    tracing::warn!(%err, "failed to send room avatar update");
                }
                result.is_ok()
            } else {
                false
            };
            actor.update(|p| {
                p.avatar_id = new_avatar_id.to_string();
                p.avatar_url = url.clone();
                p.avatar_content_hash = Some(hash);
                p.avatar_set = set;
            });
            Ok(true)
        }
        Err(err) => {
            tracing::warn!(%err, "avatar reupload failed, leaving AvatarSet unset");
            actor.update(|p| {
                p.avatar_id = new_avatar_id.to_string();
                p.avatar_set = false;
            });
            Ok(true)
        }
    }
}

/// Spec §4.7 sync_participants. Simplified relative to the full algorithm:
/// uses a single bridge-wide `NetworkApi::is_this_user` call per member
/// rather than probing every cached login individually, since this core
/// models `NetworkApi` as one collaborator object rather than per-login
/// handles (see DESIGN.md).
pub async fn sync_participants(bridge: &Bridge, actor: &PortalActor, members: &[RoomMember]) -> Result<HashSet<RoomUserId>> {
    let room_id = actor.room_id().ok_or_else(|| anyhow::anyhow!("portal has no room yet"))?;
    let mut expected = HashSet::new();

    for member in members {
        let Some(user_id) = bridge.network_api.is_this_user(member) else {
            continue;
        };
        expected.insert(member.user_id.clone());
        if let Some(intent) = bridge.login_cache.double_puppet_intent(&user_id) {
            if let Err(err) = bridge.matrix_api.ensure_joined(&room_id, &intent).await {
                tracing::warn!(%err, user = %user_id, "failed to join double puppet to room");
            }
        } else if let Err(err) = bridge.matrix_api.invite_user(&room_id, &member.user_id).await {
            tracing::warn!(%err, user = %member.user_id, "failed to invite local user");
        }
    }

    let portal = actor.snapshot();
    if portal.relay_login_id.is_none() {
        let current = bridge.matrix_api.get_members(&room_id).await?;
        for member in current {
            if expected.contains(&member.user_id) || member.is_local_user.is_some() {
                continue;
            }
            if let Err(err) = bridge
                .matrix_api
                .kick_user(&room_id, &member.user_id, "User is not in remote chat")
                .await
            {
                tracing::debug!(%err, user = %member.user_id, "failed to kick non-member");
            }
        }
    }

    Ok(expected)
}

/// Builds the initial state events for a to-be-created room: bridge-info
/// under both the canonical and half-shot-legacy type names, functional
/// members (ghosts + bot), an explicit empty topic if the portal has none,
/// an avatar event if one is set, and a space-parent event if this portal
/// has a parent (spec §4.7 create_matrix_room, §6 "Room-side state events
/// produced").
fn build_initial_state(
    portal: &crate::model::Portal,
    room_caps: &crate::apis::RoomSideCapabilities,
    parent_room_id: Option<&RoomId>,
    bridge_name: &str,
    server_name: &str,
) -> Vec<InitialStateEvent> {
    let mut events = Vec::new();

    if portal.topic.is_empty() {
        events.push(InitialStateEvent {
            event_type: "m.room.topic".to_string(),
            state_key: String::new(),
            content: serde_json::json!({ "topic": "" }),
        });
    }
    if let Some(avatar_url) = &portal.avatar_url {
        events.push(InitialStateEvent {
            event_type: "m.room.avatar".to_string(),
            state_key: String::new(),
            content: serde_json::json!({ "url": avatar_url }),
        });
    }

    let beeper_room_type = if portal.is_space {
        Some("space")
    } else if portal.is_direct {
        Some("dm")
    } else {
        None
    };
    let mut bridge_info_content = serde_json::json!({
        "protocol": { "id": bridge_name },
        "channel": { "id": portal.key.chat_id.to_string() },
    });
    if let Some(room_type) = beeper_room_type {
        bridge_info_content["beeper_room_type"] = serde_json::json!(room_type);
    }
    for event_type in [BRIDGE_INFO_TYPE, BRIDGE_INFO_LEGACY_TYPE] {
        events.push(InitialStateEvent {
            event_type: event_type.to_string(),
            state_key: bridge_name.to_string(),
            content: bridge_info_content.clone(),
        });
    }

    let service_members: Vec<String> = room_caps.bot_user_id.iter().map(|id| id.0.clone()).collect();
    events.push(InitialStateEvent {
        event_type: FUNCTIONAL_MEMBERS_TYPE.to_string(),
        state_key: String::new(),
        content: serde_json::json!({ "service_members": service_members }),
    });

    if let Some(parent_room_id) = parent_room_id {
        events.push(InitialStateEvent {
            event_type: SPACE_PARENT_TYPE.to_string(),
            state_key: parent_room_id.to_string(),
            content: serde_json::json!({ "via": [server_name], "canonical": true }),
        });
    }

    events
}

/// Spec §4.7 create_matrix_room. Idempotent via the per-portal
/// `room_create_lock`.
pub async fn create_matrix_room(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, info: Option<ChatInfo>) -> Result<RoomId> {
    let _guard = actor.room_create_lock.lock().await;
    if let Some(room_id) = actor.room_id() {
        return Ok(room_id);
    }

    let info = match info {
        Some(info) => info,
        None => bridge.network_api.get_chat_info(&actor.key).await?,
    };

    actor.update(|p| {
        if let Some(name) = &info.name {
            p.name = name.clone();
        }
        if let Some(topic) = &info.topic {
            p.topic = topic.clone();
        }
        p.avatar_url = info.avatar_url.clone();
        p.avatar_content_hash = info.avatar_content_hash;
        p.is_direct = info.is_direct;
        p.is_space = info.is_space;
    });

    let portal = actor.snapshot();
    let room_caps = bridge.matrix_api.get_capabilities();

    let parent_room_id = match &portal.parent_key {
        Some(parent_key) => bridge
            .registry
            .get_by_key(bridge, parent_key, false)
            .await?
            .and_then(|parent| parent.room_id()),
        None => None,
    };

    let req = CreateRoomRequest {
        portal_key: actor.key.clone(),
        name: (!portal.name.is_empty()).then(|| portal.name.clone()),
        topic: Some(portal.topic.clone()),
        avatar_url: portal.avatar_url.clone(),
        is_direct: portal.is_direct,
        is_space: portal.is_space,
        parent_room_id: parent_room_id.clone(),
        invite: Vec::new(),
        initial_members: Vec::new(),
        preset: RoomPreset::PrivateChat,
        visibility: RoomVisibility::Private,
        local_room_id: format!("!{}:{}", portal.key.chat_id, bridge.matrix_api.server_name()),
        bot_power_level: BOT_POWER_LEVEL,
        initial_state: build_initial_state(
            &portal,
            &room_caps,
            parent_room_id.as_ref(),
            &bridge.config.bridge_name,
            &bridge.matrix_api.server_name(),
        ),
    };

    let room_id = bridge.matrix_api.create_room(req).await?;

    actor.update(|p| {
        p.room_id = Some(room_id.clone());
        p.name_set = true;
        p.topic_set = true;
        p.avatar_set = p.avatar_url.is_some();
    });
    bridge.portal_store.update(&actor.snapshot()).await?;
    bridge.registry.reindex_room_id(&actor.key, room_id.clone()).await;

    if !room_caps.auto_join_invites {
        let members = bridge.matrix_api.get_members(&room_id).await.unwrap_or_default();
        if let Err(err) = sync_participants(bridge, actor, &members).await {
            tracing::warn!(%err, "participant sync after room creation failed");
        }
    }

    Ok(room_id)
}
