//! Collaborator interfaces consumed by the core (spec §6). These are pure
//! trait boundaries — concrete room-side/network-side clients, the bridge's
//! shared login/ghost caches, and the disappearing-message sweeper are all
//! implemented outside this crate. Capability gating is a data value
//! ([`crate::capabilities::Capabilities`]) rather than trait-object casting
//! (spec §9 design note), so `NetworkApi` is a single trait whose
//! capability-gated methods default to an "unsupported" error; the real gate
//! is the `Capabilities` the handler consults before calling them.

use crate::capabilities::{Capabilities, RoomCapabilities};
use crate::error::MessageStatus;
use crate::ids::{LocalUserId, LoginId, PortalKey, RemoteUserId, RoomEventId, RoomId, RoomUserId};
use crate::intent::Intent;
use crate::model::{Message, NetworkLogin, Reaction};
use crate::room_event::{MessageContent, RelatesTo};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Outcome of `NetworkApi::handle_message` (spec §4.5 handle_message: "take
/// the returned Message row; fill defaults").
#[derive(Debug, Clone)]
pub struct HandledMessage {
    pub remote_message_id: crate::ids::RemoteMessageId,
    pub part_id: crate::ids::PartId,
    pub sender_remote_id: RemoteUserId,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct EditResult {
    pub edit_count: u32,
    pub metadata: serde_json::Value,
}

/// Canonical tuple produced by `pre_handle_reaction` (spec §4.5 handle_reaction).
#[derive(Debug, Clone)]
pub struct PreHandledReaction {
    pub sender_remote_id: RemoteUserId,
    pub emoji_id: crate::ids::EmojiId,
    pub emoji: Option<String>,
    /// 0 means no cap.
    pub max_reactions: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChatInfo {
    pub name: Option<String>,
    pub topic: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_content_hash: Option<[u8; 32]>,
    pub is_direct: bool,
    pub is_space: bool,
}

#[derive(Debug, Clone)]
pub struct RoomMember {
    pub user_id: RoomUserId,
    pub is_local_user: Option<LocalUserId>,
}

/// Base network-side collaborator (spec §6 `NetworkAPI`). The optional
/// mix-ins of the spec (`EditHandlingNetworkAPI`, `ReactionHandlingNetworkAPI`,
/// ...) are folded into this one trait as capability-gated methods; whether
/// they're actually callable is answered by `get_capabilities`, not by
/// whether the implementor overrode the default.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    fn get_capabilities(&self, portal_key: &PortalKey) -> Capabilities;

    async fn get_chat_info(&self, portal_key: &PortalKey) -> anyhow::Result<ChatInfo>;

    fn is_this_user(&self, member: &RoomMember) -> Option<LocalUserId> {
        member.is_local_user.clone()
    }

    async fn handle_message(
        &self,
        portal_key: &PortalKey,
        login: &NetworkLogin,
        content: &MessageContent,
        relates_to: &RelatesTo,
    ) -> anyhow::Result<HandledMessage>;

    async fn handle_edit(
        &self,
        _portal_key: &PortalKey,
        _login: &NetworkLogin,
        _target: &Message,
        _content: &MessageContent,
    ) -> anyhow::Result<EditResult> {
        Err(anyhow!("edits not supported by this network"))
    }

    async fn pre_handle_reaction(
        &self,
        _portal_key: &PortalKey,
        _target: &Message,
        _emoji: &str,
    ) -> anyhow::Result<PreHandledReaction> {
        Err(anyhow!("reactions not supported by this network"))
    }

    async fn handle_reaction(
        &self,
        _portal_key: &PortalKey,
        _login: &NetworkLogin,
        _target: &Message,
        _pre: &PreHandledReaction,
        _existing_to_keep: &[Reaction],
    ) -> anyhow::Result<()> {
        Err(anyhow!("reactions not supported by this network"))
    }

    async fn handle_reaction_remove(
        &self,
        _portal_key: &PortalKey,
        _login: &NetworkLogin,
        _reaction: &Reaction,
    ) -> anyhow::Result<()> {
        Err(anyhow!("reactions not supported by this network"))
    }

    async fn handle_message_remove(
        &self,
        _portal_key: &PortalKey,
        _login: &NetworkLogin,
        _target: &Message,
    ) -> anyhow::Result<()> {
        Err(anyhow!("redactions not supported by this network"))
    }

    async fn handle_read_receipt(
        &self,
        _portal_key: &PortalKey,
        _login: &NetworkLogin,
        _read_up_to: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        Err(anyhow!("read receipts not supported by this network"))
    }

    async fn handle_typing(
        &self,
        _portal_key: &PortalKey,
        _login: &NetworkLogin,
        _typing: bool,
    ) -> anyhow::Result<()> {
        Err(anyhow!("typing not supported by this network"))
    }
}

#[derive(Debug, Error)]
pub enum MatrixSendError {
    #[error("forbidden")]
    Forbidden,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct RoomSideCapabilities {
    pub auto_join_invites: bool,
    /// The bridge bot's own room-side user id, needed to seed the
    /// functional-members state event at room creation (spec §4.7).
    pub bot_user_id: Option<RoomUserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPreset {
    PrivateChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomVisibility {
    Private,
}

/// One state event seeded into a room at creation time (spec §4.7
/// CreateMatrixRoom: bridge-info, functional-members, space-parent, ...).
#[derive(Debug, Clone)]
pub struct InitialStateEvent {
    pub event_type: String,
    pub state_key: String,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub portal_key: PortalKey,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub avatar_url: Option<String>,
    pub is_direct: bool,
    pub is_space: bool,
    pub parent_room_id: Option<RoomId>,
    pub invite: Vec<RoomUserId>,
    pub initial_members: Vec<RoomUserId>,
    pub preset: RoomPreset,
    pub visibility: RoomVisibility,
    /// Beeper extension: `!<PortalID>:<ServerName>` (spec §4.7).
    pub local_room_id: String,
    /// The bridge bot's power level in the new room; everyone else is left
    /// at the server's default (spec §4.7: "bridge bot at 9001").
    pub bot_power_level: i64,
    pub initial_state: Vec<InitialStateEvent>,
}

/// Room-side collaborator (spec §6 `MatrixAPI`).
#[async_trait]
pub trait MatrixApi: Send + Sync {
    async fn send_message(
        &self,
        room_id: &RoomId,
        intent: &Intent,
        content: &MessageContent,
        relates_to: &RelatesTo,
    ) -> anyhow::Result<RoomEventId>;

    /// Sends an `m.reaction` annotating `target_event_id` (spec §4.6 handle_reaction).
    async fn send_reaction(&self, room_id: &RoomId, intent: &Intent, target_event_id: &RoomEventId, emoji: &str) -> anyhow::Result<RoomEventId>;

    async fn send_state(
        &self,
        room_id: &RoomId,
        intent: &Intent,
        event_type: &str,
        state_key: &str,
        content: serde_json::Value,
    ) -> Result<RoomEventId, MatrixSendError>;

    async fn get_members(&self, room_id: &RoomId) -> anyhow::Result<Vec<RoomMember>>;

    async fn ensure_joined(&self, room_id: &RoomId, intent: &Intent) -> anyhow::Result<()>;

    async fn invite_user(&self, room_id: &RoomId, user_id: &RoomUserId) -> anyhow::Result<()>;

    async fn kick_user(&self, room_id: &RoomId, user_id: &RoomUserId, reason: &str) -> anyhow::Result<()>;

    async fn create_room(&self, req: CreateRoomRequest) -> anyhow::Result<RoomId>;

    async fn mark_read(
        &self,
        room_id: &RoomId,
        intent: &Intent,
        up_to: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn mark_typing(&self, room_id: &RoomId, intent: &Intent, typing: bool) -> anyhow::Result<()>;

    async fn mark_unread(&self, room_id: &RoomId, intent: &Intent, unread: bool) -> anyhow::Result<()>;

    async fn tag_room(&self, room_id: &RoomId, intent: &Intent, tag: &str, tagged: bool) -> anyhow::Result<()>;

    async fn mute_room(&self, room_id: &RoomId, intent: &Intent, muted: bool) -> anyhow::Result<()>;

    async fn redact(
        &self,
        room_id: &RoomId,
        intent: &Intent,
        event_id: &RoomEventId,
        reason: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Reupload media so the room side can reference it; returns the new
    /// (url, content hash), or the unchanged hash if nothing needed uploading
    /// (spec §4.7 update_avatar).
    async fn reupload(&self, intent: &Intent, avatar_id: &str, known_hash: Option<[u8; 32]>) -> anyhow::Result<([u8; 32], Option<String>)>;

    fn get_capabilities(&self) -> RoomSideCapabilities;

    fn server_name(&self) -> String;

    async fn send_message_status(&self, room_id: &RoomId, status: &MessageStatus) -> anyhow::Result<()>;
}

/// Provider of ghost puppets (spec §3 Ghost: "out of scope for creation,
/// in-scope only through its Intent interface").
#[async_trait]
pub trait GhostApi: Send + Sync {
    async fn get_or_create_ghost(&self, remote_user_id: &RemoteUserId) -> anyhow::Result<Intent>;

    /// Lazily triggers a refresh of the ghost's display name/avatar; fire and
    /// forget (spec §4.4: "trigger a lazy ghost-info refresh").
    fn trigger_ghost_info_refresh(&self, remote_user_id: &RemoteUserId);
}

/// Bridge-wide login cache (spec §1: "Bridge-wide caches... out of scope";
/// §9: "wrapped in a Bridge value passed explicitly to Portals" rather than
/// held as global mutable state).
pub trait LoginCache: Send + Sync {
    fn logins_for_user(&self, user_id: &LocalUserId) -> Vec<NetworkLogin>;
    fn login_by_id(&self, login_id: &LoginId) -> Option<NetworkLogin>;
    fn double_puppet_intent(&self, user_id: &LocalUserId) -> Option<Intent>;
    fn user_for_login(&self, login_id: &LoginId) -> Option<LocalUserId>;
    /// Maps a room-side mxid to the local user account it belongs to, if any
    /// (spec §4.5 handle_typing: "resolve the user's preferred login").
    fn local_user_for_room_user(&self, room_user: &RoomUserId) -> Option<LocalUserId>;
}

/// Disappearing-message sweeper collaborator (spec §1, §3): the core only
/// schedules/kicks it.
pub trait DisappearingSweeper: Send + Sync {
    fn schedule(&self, entry: crate::model::DisappearingMessage);
    fn kick(&self, room_id: &RoomId);
}

pub fn default_room_capabilities() -> RoomCapabilities {
    RoomCapabilities::default()
}
