//! Translates room-side events into network-side calls (spec §4.5).

use crate::bridge::Bridge;
use crate::capabilities::Capabilities;
use crate::error::{CapabilityMissing, MessageStatus, PortalError};
use crate::ids::RowId;
use crate::intent::Intent;
use crate::login_resolver::{self, LoginResolution};
use crate::model::{Message, Reaction, UserPortal};
use crate::portal::PortalActor;
use crate::room_event::{RelatesTo, RoomEvent, RoomMessageEvent, RoomReactionEvent, RoomReceiptEvent, RoomRedactionEvent, RoomTypingEvent};
use anyhow::Result;
use std::sync::Arc;

pub async fn handle_room_event(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, user: &crate::ids::LocalUserId, event: RoomEvent) -> Result<()> {
    match event {
        RoomEvent::Message(msg) | RoomEvent::Sticker(msg) => {
            let room_id = msg.room_id.clone();
            let event_id = msg.event_id.clone();
            let result = handle_message(bridge, actor, user, &msg).await;
            emit_status(bridge, &room_id, &event_id, result).await;
        }
        RoomEvent::Reaction(reaction) => {
            let room_id = reaction.room_id.clone();
            let event_id = reaction.event_id.clone();
            let result = handle_reaction(bridge, actor, user, &reaction).await;
            emit_status(bridge, &room_id, &event_id, result).await;
        }
        RoomEvent::Redaction(redaction) => {
            let room_id = redaction.room_id.clone();
            let event_id = redaction.event_id.clone();
            let result = handle_redaction(bridge, actor, user, &redaction).await;
            emit_status(bridge, &room_id, &event_id, result).await;
        }
        RoomEvent::State(_) => {}
        RoomEvent::Receipt(receipt) => {
            if let Err(err) = handle_read_receipt(bridge, actor, user, &receipt).await {
                tracing::warn!(%err, "failed to handle read receipt");
            }
        }
        RoomEvent::Typing(typing) => {
            handle_typing(bridge, actor, &typing).await;
        }
    }
    Ok(())
}

async fn emit_status(bridge: &Bridge, room_id: &crate::ids::RoomId, event_id: &crate::ids::RoomEventId, result: Result<(), PortalError>) {
    let status = match result {
        Ok(()) => MessageStatus::success(event_id.clone()),
        Err(err) => {
            tracing::warn!(%err, event = %event_id, "room-side event failed");
            MessageStatus::from_error(event_id.clone(), &err)
        }
    };
    if let Err(err) = bridge.matrix_api.send_message_status(room_id, &status).await {
        tracing::warn!(%err, "failed to send message status");
    }
}

async fn resolve_login(bridge: &Bridge, user: &crate::ids::LocalUserId, portal: &crate::model::Portal) -> Result<(crate::model::NetworkLogin, UserPortal), PortalError> {
    match login_resolver::resolve(bridge, user, portal).await? {
        LoginResolution::Login(login, up) => Ok((login, up)),
        LoginResolution::Relay => {
            let relay_id = portal.relay_login_id.clone().ok_or(PortalError::NotLoggedIn)?;
            let login = bridge.login_cache.login_by_id(&relay_id).ok_or(PortalError::NotLoggedIn)?;
            Ok((login, UserPortal::new(user.clone(), portal.key.clone())))
        }
    }
}

async fn handle_message(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, user: &crate::ids::LocalUserId, msg: &RoomMessageEvent) -> Result<(), PortalError> {
    if msg.relates_to.replaces.is_some() {
        return handle_edit(bridge, actor, user, msg).await;
    }

    let portal = actor.snapshot();
    let caps: Capabilities = bridge.network_api.get_capabilities(&actor.key);

    if msg.content.requires_captions() && !caps.room.captions {
        return Err(PortalError::CapabilityMissing(CapabilityMissing::CaptionsNotAllowed));
    }
    if msg.content.requires_location_messages() && !caps.room.location_messages {
        return Err(PortalError::CapabilityMissing(CapabilityMissing::LocationMessagesNotAllowed));
    }

    let (login, _user_portal) = resolve_login(bridge, user, &portal).await?;

    let mut relates_to = RelatesTo::default();
    if caps.room.threads {
        relates_to.thread_root = msg.relates_to.thread_root.clone();
    }
    if caps.room.replies {
        relates_to.reply_to = msg.relates_to.reply_to.clone();
    }

    let handled = bridge
        .network_api
        .handle_message(&actor.key, &login, &msg.content, &relates_to)
        .await
        .map_err(|err| PortalError::Retriable(err.to_string()))?;

    let row = Message {
        row_id: RowId(0),
        remote_message_id: handled.remote_message_id,
        part_id: handled.part_id,
        room_id: msg.room_id.clone(),
        room_event_id: msg.event_id.clone(),
        sender_remote_id: handled.sender_remote_id,
        sender_room_user_id: Some(msg.sender.clone()),
        timestamp: handled.timestamp.unwrap_or(msg.timestamp),
        relates_to_row_id: None,
        edit_count: 0,
        metadata: handled.metadata,
    };
    bridge.message_store.insert(&row).await.map_err(PortalError::Database)?;

    if let Some(disappear) = portal.disappear
        && let Some(sweeper) = &bridge.disappearing_sweeper
    {
        let disappear_at = match disappear.disappear_type {
            crate::model::DisappearType::AfterSend => row.timestamp + disappear.timer,
            crate::model::DisappearType::AfterRead => row.timestamp,
        };
        sweeper.schedule(crate::model::DisappearingMessage {
            room_id: row.room_id.clone(),
            room_event_id: row.room_event_id.clone(),
            disappear_at,
            disappear_type: disappear.disappear_type,
        });
    }

    Ok(())
}

async fn handle_edit(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, user: &crate::ids::LocalUserId, msg: &RoomMessageEvent) -> Result<(), PortalError> {
    let portal = actor.snapshot();
    let caps = bridge.network_api.get_capabilities(&actor.key);
    if !caps.client.edit {
        return Err(PortalError::CapabilityMissing(CapabilityMissing::EditsNotSupported));
    }
    if !caps.room.edits {
        return Err(PortalError::CapabilityMissing(CapabilityMissing::EditsNotSupportedInPortal));
    }

    let target_event_id = msg.relates_to.replaces.clone().expect("handle_edit called without replaces set");
    let target = bridge
        .message_store
        .get_by_mxid(&target_event_id)
        .await
        .map_err(PortalError::Database)?
        .ok_or_else(PortalError::edit_target_not_found)?;

    if let Some(max_age) = caps.room.edit_max_age.or(bridge.config.edit_max_age) {
        let age = chrono::Utc::now().signed_duration_since(target.timestamp);
        if age.to_std().unwrap_or_default() > max_age {
            return Err(PortalError::EditTargetTooOld);
        }
    }
    if let Some(max_count) = caps.room.edit_max_count.or(bridge.config.edit_max_count)
        && target.edit_count >= max_count
    {
        return Err(PortalError::EditTargetTooManyEdits);
    }

    let (login, _) = resolve_login(bridge, user, &portal).await?;
    let edit = bridge
        .network_api
        .handle_edit(&actor.key, &login, &target, &msg.content)
        .await
        .map_err(|err| PortalError::Retriable(err.to_string()))?;

    let mut updated = target;
    updated.edit_count = edit.edit_count;
    updated.metadata = edit.metadata;
    bridge.message_store.update(&updated).await.map_err(PortalError::Database)?;
    Ok(())
}

async fn handle_reaction(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, user: &crate::ids::LocalUserId, event: &RoomReactionEvent) -> Result<(), PortalError> {
    if event.from_relay {
        return Err(PortalError::RelayedReactionForbidden);
    }

    let caps = bridge.network_api.get_capabilities(&actor.key);
    if !caps.client.reaction {
        return Err(PortalError::CapabilityMissing(CapabilityMissing::ReactionsNotSupported));
    }

    let portal = actor.snapshot();
    let target = bridge
        .message_store
        .get_by_mxid(&event.target_event_id)
        .await
        .map_err(PortalError::Database)?
        .ok_or(PortalError::TargetMessageNotFound { action: "reaction" })?;

    let (login, _) = resolve_login(bridge, user, &portal).await?;
    let pre = bridge
        .network_api
        .pre_handle_reaction(&actor.key, &target, &event.emoji)
        .await
        .map_err(|err| PortalError::Retriable(err.to_string()))?;

    let existing = bridge
        .reaction_store
        .get_by_key(&target.remote_message_id, &target.part_id, &pre.sender_remote_id, &pre.emoji_id)
        .await
        .map_err(PortalError::Database)?;

    if let Some(existing) = &existing {
        let same_emoji = !pre.emoji_id.is_none() || existing.emoji.as_deref() == pre.emoji.as_deref();
        if same_emoji {
            return Ok(());
        }
        if let Err(err) = bridge
            .matrix_api
            .redact(&target.room_id, &Intent::Bot, &existing.room_event_id, None)
            .await
        {
            tracing::warn!(%err, "failed to redact superseded reaction");
        }
    }

    let max_reactions = if pre.max_reactions > 0 {
        pre.max_reactions
    } else {
        bridge.config.max_reactions.unwrap_or(0)
    };

    let mut existing_to_keep = Vec::new();
    if max_reactions > 0 {
        let mut all = bridge
            .reaction_store
            .get_all_to_message_by_sender(&target.remote_message_id, &target.part_id, &pre.sender_remote_id)
            .await
            .map_err(PortalError::Database)?;
        all.sort_by_key(|r| r.timestamp);
        let keep_count = (max_reactions as usize).saturating_sub(1);
        if all.len() > keep_count {
            let to_redact = all.split_off(keep_count);
            for r in to_redact {
                if let Err(err) = bridge.matrix_api.redact(&target.room_id, &Intent::Bot, &r.room_event_id, None).await {
                    tracing::warn!(%err, "failed to redact reaction over the cap");
                }
                let _ = bridge
                    .reaction_store
                    .delete(&r.remote_message_id, &r.part_id, &r.sender_remote_id, &r.emoji_id)
                    .await;
            }
        }
        existing_to_keep = all;
    }

    bridge
        .network_api
        .handle_reaction(&actor.key, &login, &target, &pre, &existing_to_keep)
        .await
        .map_err(|err| PortalError::Retriable(err.to_string()))?;

    bridge
        .reaction_store
        .upsert(&Reaction {
            remote_message_id: target.remote_message_id.clone(),
            part_id: target.part_id.clone(),
            sender_remote_id: pre.sender_remote_id,
            emoji_id: pre.emoji_id,
            room_event_id: event.event_id.clone(),
            timestamp: event.timestamp,
            emoji: pre.emoji,
        })
        .await
        .map_err(PortalError::Database)?;

    Ok(())
}

async fn handle_redaction(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, user: &crate::ids::LocalUserId, event: &RoomRedactionEvent) -> Result<(), PortalError> {
    let caps = bridge.network_api.get_capabilities(&actor.key);
    if !caps.client.redaction && !caps.client.reaction {
        return Err(PortalError::CapabilityMissing(CapabilityMissing::RedactionsNotSupported));
    }

    let portal = actor.snapshot();
    let (login, _) = resolve_login(bridge, user, &portal).await?;

    if let Some(message) = bridge
        .message_store
        .get_by_mxid(&event.target_event_id)
        .await
        .map_err(PortalError::Database)?
    {
        if !caps.client.redaction {
            return Err(PortalError::CapabilityMissing(CapabilityMissing::RedactionsNotSupported));
        }
        bridge
            .network_api
            .handle_message_remove(&actor.key, &login, &message)
            .await
            .map_err(|err| PortalError::Retriable(err.to_string()))?;
        bridge
            .message_store
            .delete_part(&message.remote_message_id, &message.part_id)
            .await
            .map_err(PortalError::Database)?;
        return Ok(());
    }

    let reaction = bridge
        .reaction_store
        .get_by_room_event_id(&event.target_event_id)
        .await
        .map_err(PortalError::Database)?;
    if let Some(reaction) = reaction {
        if !caps.client.reaction {
            return Err(PortalError::CapabilityMissing(CapabilityMissing::ReactionsNotSupported));
        }
        bridge
            .network_api
            .handle_reaction_remove(&actor.key, &login, &reaction)
            .await
            .map_err(|err| PortalError::Retriable(err.to_string()))?;
        bridge
            .reaction_store
            .delete(&reaction.remote_message_id, &reaction.part_id, &reaction.sender_remote_id, &reaction.emoji_id)
            .await
            .map_err(PortalError::Database)?;
        return Ok(());
    }

    Err(PortalError::redaction_target_not_found())
}

async fn handle_typing(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, event: &RoomTypingEvent) {
    let mut sorted = event.user_ids.clone();
    sorted.sort();
    let (started, stopped) = actor.typing.diff(&sorted);

    if started.is_empty() && stopped.is_empty() {
        return;
    }

    let portal = actor.snapshot();
    let caps = bridge.network_api.get_capabilities(&actor.key);

    for room_user in &started {
        if !caps.client.typing {
            continue;
        }
        let Some(local_user) = bridge.login_cache.local_user_for_room_user(room_user) else {
            continue;
        };
        let Ok((login, _)) = resolve_login(bridge, &local_user, &portal).await else {
            continue;
        };
        actor.typing.record_login(room_user.clone(), login.login_id.clone());
        if let Err(err) = bridge.network_api.handle_typing(&actor.key, &login, true).await {
            tracing::debug!(%err, "failed to send typing start");
        }
    }

    for room_user in &stopped {
        actor.typing.drop_login(room_user);
    }

    if !started.is_empty() {
        bridge.ensure_typing_refresher(actor);
    }
}

async fn handle_read_receipt(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, user: &crate::ids::LocalUserId, event: &RoomReceiptEvent) -> Result<(), PortalError> {
    let caps = bridge.network_api.get_capabilities(&actor.key);
    if !caps.client.read_receipt {
        return Ok(());
    }

    let portal = actor.snapshot();
    let (login, mut user_portal) = resolve_login(bridge, user, &portal).await?;

    let read_up_to = match &event.event_id {
        Some(event_id) => bridge
            .message_store
            .get_by_mxid(event_id)
            .await
            .map_err(PortalError::Database)?
            .map(|m| m.timestamp)
            .unwrap_or(event.timestamp),
        None => event.timestamp,
    };

    bridge
        .network_api
        .handle_read_receipt(&actor.key, &login, read_up_to)
        .await
        .map_err(|err| PortalError::Retriable(err.to_string()))?;

    user_portal.last_read = Some(read_up_to);
    bridge.user_portal_store.upsert(&user_portal).await.map_err(PortalError::Database)?;

    if let Some(sweeper) = &bridge.disappearing_sweeper {
        sweeper.kick(&event.room_id);
    }

    Ok(())
}
