//! Translates network-side events into room-side calls (spec §4.6).

use crate::bridge::Bridge;
use crate::error::ConversionFailureNotice;
use crate::ids::{PartId, RoomId, RowId};
use crate::intent::{self, Intent};
use crate::model::{DisappearType, Message, Reaction};
use crate::portal::PortalActor;
use crate::remote_event::{EventSender, RemoteEvent};
use crate::room_event::{MessageContent, RelatesTo};
use anyhow::Result;
use std::sync::Arc;

pub async fn handle_network_event(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, login: &crate::model::NetworkLogin, event: RemoteEvent) -> Result<()> {
    if actor.room_id().is_none() {
        if event.may_create_portal() {
            if let Err(err) = crate::metadata_sync::create_matrix_room(bridge, actor, None).await {
                tracing::error!(%err, "failed to create room for incoming network event");
                return Ok(());
            }
        } else {
            tracing::debug!(kind = event.kind_name(), "dropping network event, portal has no room yet");
            return Ok(());
        }
    }

    match event {
        RemoteEvent::Message(msg) => handle_message(bridge, actor, msg.as_ref()).await,
        RemoteEvent::Edit(edit) => handle_edit(bridge, actor, edit.as_ref()).await,
        RemoteEvent::Reaction(reaction) => handle_reaction(bridge, actor, reaction.as_ref()).await,
        RemoteEvent::ReactionRemove(remove) => handle_reaction_remove(bridge, actor, remove.as_ref()).await,
        RemoteEvent::MessageRemove(remove) => handle_message_remove(bridge, actor, remove.as_ref()).await,
        RemoteEvent::ReadReceipt(receipt) => handle_read_receipt(bridge, actor, receipt.as_ref()).await,
        RemoteEvent::MarkUnread(mark) => handle_mark_unread(bridge, actor, login, mark.as_ref()).await,
        RemoteEvent::ChatTag(tag) => handle_chat_tag(bridge, actor, login, tag.as_ref()).await,
        RemoteEvent::ChatMute(mute) => handle_chat_mute(bridge, actor, login, mute.as_ref()).await,
        RemoteEvent::Typing(_) | RemoteEvent::DeliveryReceipt => Ok(()),
        RemoteEvent::Unknown(kind) => {
            tracing::warn!(kind = %kind, "dropping unknown remote event kind");
            Ok(())
        }
    }
}

async fn resolve_event_intent(bridge: &Bridge, sender: &EventSender) -> Option<Intent> {
    intent::resolve_intent(bridge.login_cache.as_ref(), &bridge.ghost_api, sender).await
}

async fn send_conversion_failure_notice(bridge: &Bridge, room_id: &RoomId, intent: &Intent, kind: &str, err: &anyhow::Error) {
    let notice = ConversionFailureNotice::new(kind, err);
    tracing::warn!(%err, kind, "failed to convert incoming remote event");
    let content = MessageContent::Notice(notice.text);
    if let Err(err) = bridge.matrix_api.send_message(room_id, intent, &content, &RelatesTo::default()).await {
        tracing::warn!(%err, "failed to send conversion failure notice");
    }
}

/// Looks up the row for `remote_message_id` (first part) to use as a
/// reply/thread-root target, returning its room event id alongside the row.
async fn resolve_relation_target(bridge: &Bridge, remote_message_id: Option<&crate::ids::RemoteMessageId>) -> Option<Message> {
    let id = remote_message_id?;
    bridge.message_store.get_first_part_by_id(id).await.ok().flatten()
}

async fn handle_message(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, msg: &dyn crate::remote_event::RemoteMessage) -> Result<()> {
    if bridge
        .message_store
        .get_first_part_by_id(&msg.remote_message_id())
        .await?
        .is_some()
    {
        tracing::debug!(id = %msg.remote_message_id(), "duplicate remote message, dropping");
        return Ok(());
    }

    let sender = msg.sender();
    let Some(intent) = resolve_event_intent(bridge, &sender).await else {
        return Ok(());
    };

    let portal = actor.snapshot();
    let room_id = portal.room_id.clone().expect("room created by preconditions");

    let converted = match msg.convert_message(&portal, &intent).await {
        Ok(c) => c,
        Err(err) => {
            send_conversion_failure_notice(bridge, &room_id, &intent, "message", &err).await;
            return Ok(());
        }
    };

    let thread_root = resolve_relation_target(bridge, converted.thread_root.as_ref()).await;
    let reply_target = resolve_relation_target(bridge, converted.reply_to.as_ref()).await;
    let relates_to_row_id = thread_root.as_ref().or(reply_target.as_ref()).map(|m| m.row_id);

    let mut prev_thread_event_id = thread_root.as_ref().map(|m| m.room_event_id.clone());

    for part in converted.parts {
        let mut relates_to = RelatesTo::default();
        if let Some(thread_root) = &thread_root {
            relates_to.thread_root = Some(thread_root.room_event_id.clone());
            relates_to.reply_to = prev_thread_event_id.clone();
        } else if let Some(reply_target) = &reply_target {
            relates_to.reply_to = Some(reply_target.room_event_id.clone());
            if let Some(mentioned) = &reply_target.sender_room_user_id {
                relates_to.mentions.push(mentioned.clone());
            }
        }

        let sent_event_id = match bridge.matrix_api.send_message(&room_id, &intent, &part.content, &relates_to).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, part = %part.part_id, "failed to send message part, continuing");
                continue;
            }
        };
        prev_thread_event_id = Some(sent_event_id.clone());

        let row = Message {
            row_id: RowId(0),
            remote_message_id: msg.remote_message_id(),
            part_id: part.part_id,
            room_id: room_id.clone(),
            room_event_id: sent_event_id,
            sender_remote_id: sender.sender.clone(),
            sender_room_user_id: None,
            timestamp: msg.timestamp(),
            relates_to_row_id,
            edit_count: 0,
            metadata: serde_json::Value::Null,
        };
        let row_id = bridge.message_store.insert(&row).await?;

        if let Some(disappear) = &converted.disappear
            && let Some(sweeper) = &bridge.disappearing_sweeper
        {
            let disappear_at = match disappear.disappear_type {
                DisappearType::AfterSend => row.timestamp + disappear.timer,
                DisappearType::AfterRead => row.timestamp,
            };
            sweeper.schedule(crate::model::DisappearingMessage {
                room_id: row.room_id.clone(),
                room_event_id: row.room_event_id.clone(),
                disappear_at,
                disappear_type: disappear.disappear_type,
            });
        }
        let _ = row_id;
    }

    Ok(())
}

async fn handle_edit(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, edit: &dyn crate::remote_event::RemoteEdit) -> Result<()> {
    let parts = bridge.message_store.get_all_parts_by_id(&edit.target_remote_message_id()).await?;
    if parts.is_empty() {
        tracing::debug!(id = %edit.target_remote_message_id(), "edit target not found, dropping");
        return Ok(());
    }

    let sender = edit.sender();
    let Some(intent) = resolve_event_intent(bridge, &sender).await else {
        return Ok(());
    };

    let portal = actor.snapshot();
    let room_id = portal.room_id.clone().expect("room created by preconditions");

    let converted = match edit.convert_edit(&portal, &intent, &parts).await {
        Ok(c) => c,
        Err(err) => {
            send_conversion_failure_notice(bridge, &room_id, &intent, "edit", &err).await;
            return Ok(());
        }
    };

    for part in converted.modified_parts {
        let Some(existing) = parts.iter().find(|m| m.part_id == part.part_id) else {
            continue;
        };
        let relates_to = RelatesTo {
            replaces: Some(existing.room_event_id.clone()),
            ..Default::default()
        };
        match bridge.matrix_api.send_message(&room_id, &intent, &part.content, &relates_to).await {
            Ok(_) => {
                let mut updated = existing.clone();
                updated.edit_count += 1;
                bridge.message_store.update(&updated).await?;
            }
            Err(err) => tracing::warn!(%err, part = %part.part_id, "failed to send edit"),
        }
    }

    for part_id in converted.deleted_parts {
        let Some(existing) = parts.iter().find(|m| m.part_id == part_id) else {
            continue;
        };
        if let Err(err) = bridge.matrix_api.redact(&room_id, &intent, &existing.room_event_id, None).await {
            tracing::warn!(%err, part = %part_id, "failed to redact deleted part");
        }
        bridge.message_store.delete_part(&existing.remote_message_id, &existing.part_id).await?;
    }

    Ok(())
}

async fn handle_reaction(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, reaction: &dyn crate::remote_event::RemoteReaction) -> Result<()> {
    let target_part_id = reaction.target_part().unwrap_or_else(PartId::only);
    let Some(target) = bridge
        .message_store
        .get_part_by_id(&reaction.target_remote_message_id(), &target_part_id)
        .await?
    else {
        tracing::debug!(id = %reaction.target_remote_message_id(), "reaction target not found, dropping");
        return Ok(());
    };

    let sender = reaction.sender();
    let emoji_id = reaction.emoji_id();
    let emoji = reaction.emoji();

    let existing = bridge
        .reaction_store
        .get_by_key(&target.remote_message_id, &target.part_id, &sender.sender, &emoji_id)
        .await?;

    if let Some(existing) = &existing {
        if existing.emoji.as_deref() == emoji.as_deref() {
            return Ok(());
        }
    }

    let Some(intent) = resolve_event_intent(bridge, &sender).await else {
        return Ok(());
    };

    let literal = emoji.clone().unwrap_or_default();
    let sent_event_id = bridge.matrix_api.send_reaction(&target.room_id, &intent, &target.room_event_id, &literal).await?;

    if let Some(existing) = &existing
        && let Err(err) = bridge.matrix_api.redact(&target.room_id, &Intent::Bot, &existing.room_event_id, None).await
    {
        tracing::warn!(%err, "failed to redact superseded remote reaction");
    }

    bridge
        .reaction_store
        .upsert(&Reaction {
            remote_message_id: target.remote_message_id.clone(),
            part_id: target.part_id.clone(),
            sender_remote_id: sender.sender,
            emoji_id,
            room_event_id: sent_event_id,
            timestamp: chrono::Utc::now(),
            emoji,
        })
        .await?;

    Ok(())
}

async fn handle_reaction_remove(bridge: &Arc<Bridge>, _actor: &Arc<PortalActor>, remove: &dyn crate::remote_event::RemoteReactionRemove) -> Result<()> {
    let sender = remove.sender();
    let target_part_id = remove.target_part().unwrap_or_else(PartId::only);
    let emoji_id = remove.emoji_id();

    let Some(existing) = bridge
        .reaction_store
        .get_by_key(&remove.target_remote_message_id(), &target_part_id, &sender.sender, &emoji_id)
        .await?
    else {
        return Ok(());
    };

    let room_id = bridge
        .message_store
        .get_part_by_id(&existing.remote_message_id, &existing.part_id)
        .await?
        .map(|m| m.room_id);

    if let Some(room_id) = room_id
        && let Err(err) = bridge.matrix_api.redact(&room_id, &Intent::Bot, &existing.room_event_id, None).await
    {
        tracing::warn!(%err, "failed to redact removed remote reaction");
    }

    bridge
        .reaction_store
        .delete(&existing.remote_message_id, &existing.part_id, &sender.sender, &emoji_id)
        .await?;
    Ok(())
}

async fn handle_message_remove(bridge: &Arc<Bridge>, _actor: &Arc<PortalActor>, remove: &dyn crate::remote_event::RemoteMessageRemove) -> Result<()> {
    let parts = bridge.message_store.get_all_parts_by_id(&remove.target_remote_message_id()).await?;
    for part in parts {
        if let Err(err) = bridge.matrix_api.redact(&part.room_id, &Intent::Bot, &part.room_event_id, None).await {
            tracing::warn!(%err, part = %part.part_id, "failed to redact removed remote message part");
        }
        bridge.message_store.delete_part(&part.remote_message_id, &part.part_id).await?;
    }
    Ok(())
}

async fn handle_read_receipt(bridge: &Arc<Bridge>, _actor: &Arc<PortalActor>, receipt: &dyn crate::remote_event::RemoteReadReceipt) -> Result<()> {
    let sender = receipt.sender();
    let Some(intent) = resolve_event_intent(bridge, &sender).await else {
        return Ok(());
    };

    let target = match receipt.last_receipt_target() {
        Some(id) => Some(id),
        None => receipt
            .receipt_targets()
            .into_iter()
            .max_by_key(|t| t.timestamp)
            .map(|t| t.remote_message_id),
    };

    let Some(target_id) = target else {
        return Ok(());
    };
    let Some(message) = bridge.message_store.get_first_part_by_id(&target_id).await? else {
        return Ok(());
    };

    bridge.matrix_api.mark_read(&message.room_id, &intent, message.timestamp).await?;

    if sender.is_from_me
        && let Some(sweeper) = &bridge.disappearing_sweeper
    {
        sweeper.kick(&message.room_id);
    }

    Ok(())
}

/// `handle_mark_unread`/`handle_chat_tag`/`handle_chat_mute` only make sense
/// for the local user's own double-puppet (spec §4.6).
async fn self_double_puppet_intent(bridge: &Bridge, sender: &EventSender) -> Option<Intent> {
    if !sender.is_from_me {
        return None;
    }
    let login_id = sender.sender_login.as_ref()?;
    let user_id = bridge.login_cache.user_for_login(login_id)?;
    let intent = bridge.login_cache.double_puppet_intent(&user_id)?;
    Some(intent)
}

async fn handle_mark_unread(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, _login: &crate::model::NetworkLogin, mark: &dyn crate::remote_event::RemoteMarkUnread) -> Result<()> {
    let Some(intent) = self_double_puppet_intent(bridge, &mark.sender()).await else {
        return Ok(());
    };
    let room_id = actor.room_id().expect("room created by preconditions");
    bridge.matrix_api.mark_unread(&room_id, &intent, mark.unread()).await?;
    Ok(())
}

async fn handle_chat_tag(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, _login: &crate::model::NetworkLogin, tag: &dyn crate::remote_event::RemoteChatTag) -> Result<()> {
    let Some(intent) = self_double_puppet_intent(bridge, &tag.sender()).await else {
        return Ok(());
    };
    let room_id = actor.room_id().expect("room created by preconditions");
    bridge.matrix_api.tag_room(&room_id, &intent, &tag.tag(), tag.tagged()).await?;
    Ok(())
}

async fn handle_chat_mute(bridge: &Arc<Bridge>, actor: &Arc<PortalActor>, _login: &crate::model::NetworkLogin, mute: &dyn crate::remote_event::RemoteChatMute) -> Result<()> {
    let Some(intent) = self_double_puppet_intent(bridge, &mute.sender()).await else {
        return Ok(());
    };
    let room_id = actor.room_id().expect("room created by preconditions");
    bridge.matrix_api.mute_room(&room_id, &intent, mute.muted()).await?;
    Ok(())
}
