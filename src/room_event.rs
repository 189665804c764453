//! Room-side events consumed by [`crate::room_handler::RoomSideHandler`]
//! (spec §4.5). Parsed content objects, not wire payloads (spec §6: "the core
//! consumes pre-parsed event content objects").

use crate::ids::{RoomEventId, RoomId, RoomUserId};
use chrono::{DateTime, Utc};

/// Parsed `m.room.message`/sticker content. Text/notice/emote are not
/// capability-pre-checked (spec §4.5: "their length is validated during
/// conversion"); caption and location are, against [`crate::capabilities::RoomCapabilities`].
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    Notice(String),
    Emote(String),
    Caption { body: String, media_url: String },
    Location { body: String, geo_uri: String },
    Sticker { body: String, media_url: String },
}

impl MessageContent {
    pub fn requires_captions(&self) -> bool {
        matches!(self, MessageContent::Caption { .. })
    }

    pub fn requires_location_messages(&self) -> bool {
        matches!(self, MessageContent::Location { .. })
    }
}

/// Relation fields carried by a room-side message event.
#[derive(Debug, Clone, Default)]
pub struct RelatesTo {
    /// Set when this event is an edit of `replaces` (spec §4.5 handle_message:
    /// "If RelatesTo.replaces is set, delegate to handle_edit").
    pub replaces: Option<RoomEventId>,
    pub reply_to: Option<RoomEventId>,
    pub thread_root: Option<RoomEventId>,
    /// Room-side user ids to mention, deduplicated (spec §4.6 handle_message:
    /// "inject the replied-to sender's room-side user-id into mentions.user_ids").
    pub mentions: Vec<RoomUserId>,
}

#[derive(Debug, Clone)]
pub struct RoomMessageEvent {
    pub event_id: RoomEventId,
    pub room_id: RoomId,
    pub sender: RoomUserId,
    pub timestamp: DateTime<Utc>,
    pub content: MessageContent,
    pub relates_to: RelatesTo,
}

#[derive(Debug, Clone)]
pub struct RoomReactionEvent {
    pub event_id: RoomEventId,
    pub room_id: RoomId,
    pub sender: RoomUserId,
    pub timestamp: DateTime<Utc>,
    pub target_event_id: RoomEventId,
    pub emoji: String,
    /// Reactions from a relayed origin are forbidden (spec §4.5 handle_reaction).
    pub from_relay: bool,
}

#[derive(Debug, Clone)]
pub struct RoomRedactionEvent {
    pub event_id: RoomEventId,
    pub room_id: RoomId,
    pub sender: RoomUserId,
    pub timestamp: DateTime<Utc>,
    pub target_event_id: RoomEventId,
}

/// State events the core accepts but does not translate (spec §4.5: "stubs —
/// accepted silently"). Name/topic/avatar changes on the room side are not
/// mirrored back to the network by this core; [`crate::metadata_sync`] only
/// flows network → room.
#[derive(Debug, Clone)]
pub enum RoomStateStub {
    Name,
    Topic,
    Avatar,
    Encryption,
}

#[derive(Debug, Clone)]
pub struct RoomReceiptEvent {
    pub room_id: RoomId,
    pub sender: RoomUserId,
    pub event_id: Option<RoomEventId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RoomTypingEvent {
    pub room_id: RoomId,
    pub user_ids: Vec<RoomUserId>,
}

/// Dispatch union for room-side events (spec §4.5 dispatch table).
pub enum RoomEvent {
    Message(RoomMessageEvent),
    Sticker(RoomMessageEvent),
    Reaction(RoomReactionEvent),
    Redaction(RoomRedactionEvent),
    State(RoomStateStub),
    Receipt(RoomReceiptEvent),
    Typing(RoomTypingEvent),
}

impl RoomEvent {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, RoomEvent::Receipt(_) | RoomEvent::Typing(_))
    }
}
