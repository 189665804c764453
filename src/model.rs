//! Persisted entities (spec §3). Shaped after the teacher's plain, serde-derived
//! structs in `models.rs`, but keyed by the newtypes in [`crate::ids`] instead of
//! bare `String`s.

use crate::ids::{
    EmojiId, LoginId, NetworkChatId, PartId, PortalKey, Receiver, RemoteMessageId, RemoteUserId,
    RoomEventId, RoomId, RoomUserId, RowId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Disappearing-message setting attached to a [`Portal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisappearType {
    /// Timer starts when the message is sent.
    AfterSend,
    /// Timer starts when the message is read by the recipient.
    AfterRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisappearSetting {
    pub disappear_type: DisappearType,
    pub timer: chrono::Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portal {
    pub key: PortalKey,
    pub room_id: Option<RoomId>,
    pub parent_key: Option<PortalKey>,
    pub name: String,
    pub topic: String,
    pub avatar_id: String,
    pub avatar_url: Option<String>,
    /// 32-byte content hash of the currently-applied avatar, if any.
    pub avatar_content_hash: Option<[u8; 32]>,
    pub name_set: bool,
    pub topic_set: bool,
    pub avatar_set: bool,
    pub is_direct: bool,
    pub is_space: bool,
    pub disappear: Option<DisappearSetting>,
    pub relay_login_id: Option<LoginId>,
}

impl Portal {
    pub fn new(key: PortalKey) -> Self {
        Portal {
            key,
            room_id: None,
            parent_key: None,
            name: String::new(),
            topic: String::new(),
            avatar_id: String::new(),
            avatar_url: None,
            avatar_content_hash: None,
            name_set: false,
            topic_set: false,
            avatar_set: false,
            is_direct: false,
            is_space: false,
            disappear: None,
            relay_login_id: None,
        }
    }

    pub fn has_room(&self) -> bool {
        self.room_id.is_some()
    }
}

/// One room-side event produced from a (possibly multi-part) remote message
/// (spec §3). Uniqueness: (remote_message_id, part_id) and room_event_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub row_id: RowId,
    pub remote_message_id: RemoteMessageId,
    pub part_id: PartId,
    pub room_id: RoomId,
    pub room_event_id: RoomEventId,
    pub sender_remote_id: RemoteUserId,
    pub sender_room_user_id: Option<RoomUserId>,
    pub timestamp: DateTime<Utc>,
    pub relates_to_row_id: Option<RowId>,
    pub edit_count: u32,
    /// Opaque per-network metadata (spec §3): we don't interpret it, only store it.
    pub metadata: serde_json::Value,
}

/// Composite-key reaction row (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub remote_message_id: RemoteMessageId,
    pub part_id: PartId,
    pub sender_remote_id: RemoteUserId,
    pub emoji_id: EmojiId,
    pub room_event_id: RoomEventId,
    pub timestamp: DateTime<Utc>,
    /// Literal emoji text, used when `emoji_id` is empty (free-form reactions).
    pub emoji: Option<String>,
}

impl Reaction {
    pub fn key_matches(&self, remote_message_id: &RemoteMessageId, part_id: &PartId, sender: &RemoteUserId, emoji_id: &EmojiId) -> bool {
        &self.remote_message_id == remote_message_id
            && &self.part_id == part_id
            && &self.sender_remote_id == sender
            && &self.emoji_id == emoji_id
    }
}

/// Per (local user, portal) link (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPortal {
    pub user_id: crate::ids::LocalUserId,
    pub portal_key: PortalKey,
    pub last_read: Option<DateTime<Utc>>,
    /// Whether this user is considered "in the room" on the network side.
    pub in_remote_chat: bool,
}

impl UserPortal {
    pub fn new(user_id: crate::ids::LocalUserId, portal_key: PortalKey) -> Self {
        UserPortal {
            user_id,
            portal_key,
            last_read: None,
            in_remote_chat: false,
        }
    }
}

/// A scheduled disappearance (spec §3). The core owns scheduling/kicking it;
/// the sweep itself is an out-of-scope collaborator loop (spec §1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisappearingMessage {
    pub room_id: RoomId,
    pub room_event_id: RoomEventId,
    pub disappear_at: DateTime<Utc>,
    pub disappear_type: DisappearType,
}

/// A network login belonging to a local user. Only the fields the core needs
/// to resolve to are modeled; the client itself is a collaborator handle in
/// [`crate::apis::NetworkApi`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLogin {
    pub login_id: LoginId,
    pub user_id: crate::ids::LocalUserId,
    pub connected: bool,
    pub has_double_puppet: bool,
}

/// Construct a split [`PortalKey`] for a DM where the network has no stable
/// chat identity of its own.
pub fn dm_portal_key(other_party: &str, receiver: &str) -> PortalKey {
    PortalKey {
        chat_id: NetworkChatId(other_party.to_string()),
        receiver: Receiver(receiver.to_string()),
    }
}
