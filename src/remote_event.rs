//! Network-side events consumed by [`crate::network_handler::NetworkSideHandler`]
//! (spec §4.6, §6). Modeled as a discriminated enum over trait objects rather
//! than the source bridge's runtime interface assertions (spec §9 design note):
//! each variant's trait carries only the capability methods that kind of event
//! can sensibly answer, with defaulted no-op implementations standing in for
//! the optional `With*`/`May*` mix-ins.

use crate::ids::{LoginId, PartId, RemoteMessageId, RemoteUserId};
use crate::model::DisappearSetting;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Identifies who sent a remote event (spec §4.4 IntentResolver input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSender {
    pub sender: RemoteUserId,
    pub sender_login: Option<LoginId>,
    pub is_from_me: bool,
}

/// A single converted room-side part of an incoming remote message
/// (spec §4.6 handle_message: `ConvertedMessage { Parts[], ... }`).
#[derive(Debug, Clone)]
pub struct ConvertedPart {
    pub part_id: PartId,
    pub content: crate::room_event::MessageContent,
}

#[derive(Debug, Clone, Default)]
pub struct ConvertedMessage {
    pub parts: Vec<ConvertedPart>,
    pub reply_to: Option<RemoteMessageId>,
    pub thread_root: Option<RemoteMessageId>,
    pub disappear: Option<DisappearSetting>,
}

#[derive(Debug, Clone, Default)]
pub struct ConvertedEdit {
    pub modified_parts: Vec<ConvertedPart>,
    pub deleted_parts: Vec<PartId>,
}

/// Extra context an event can contribute to the span/log record for the
/// portal that's handling it (spec §6 `AddLogContext`).
pub type LogContext = Vec<(&'static str, String)>;

#[async_trait]
pub trait RemoteMessage: Send + Sync {
    fn sender(&self) -> EventSender;
    fn remote_message_id(&self) -> RemoteMessageId;
    fn timestamp(&self) -> DateTime<Utc>;

    /// `MayCreatePortal` (spec §4.6 preconditions). Most message events should
    /// create a portal on first contact; events that shouldn't (synthetic,
    /// backfilled, ...) override this to `false`.
    fn should_create_portal(&self) -> bool {
        true
    }

    async fn convert_message(
        &self,
        portal: &crate::model::Portal,
        intent: &crate::intent::Intent,
    ) -> anyhow::Result<ConvertedMessage>;

    fn log_context(&self) -> LogContext {
        Vec::new()
    }
}

#[async_trait]
pub trait RemoteEdit: Send + Sync {
    fn sender(&self) -> EventSender;
    fn target_remote_message_id(&self) -> RemoteMessageId;
    fn timestamp(&self) -> DateTime<Utc>;

    async fn convert_edit(
        &self,
        portal: &crate::model::Portal,
        intent: &crate::intent::Intent,
        existing_parts: &[crate::model::Message],
    ) -> anyhow::Result<ConvertedEdit>;

    fn log_context(&self) -> LogContext {
        Vec::new()
    }
}

/// `ReactionWithMeta` (spec §6): extra metadata a reaction event may carry
/// beyond the bare (sender, emoji) pair, e.g. a custom-emoji image URL.
#[derive(Debug, Clone, Default)]
pub struct ReactionMeta {
    pub custom_emoji_url: Option<String>,
}

#[async_trait]
pub trait RemoteReaction: Send + Sync {
    fn sender(&self) -> EventSender;
    fn target_remote_message_id(&self) -> RemoteMessageId;
    /// `WithTargetPart` (spec §6): some networks can target one specific part
    /// of a multi-part message.
    fn target_part(&self) -> Option<PartId> {
        None
    }
    fn emoji_id(&self) -> crate::ids::EmojiId {
        crate::ids::EmojiId::none()
    }
    fn emoji(&self) -> Option<String>;
    fn timestamp(&self) -> DateTime<Utc>;
    fn meta(&self) -> ReactionMeta {
        ReactionMeta::default()
    }
}

#[async_trait]
pub trait RemoteReactionRemove: Send + Sync {
    fn sender(&self) -> EventSender;
    fn target_remote_message_id(&self) -> RemoteMessageId;
    fn target_part(&self) -> Option<PartId> {
        None
    }
    fn emoji_id(&self) -> crate::ids::EmojiId {
        crate::ids::EmojiId::none()
    }
}

#[async_trait]
pub trait RemoteMessageRemove: Send + Sync {
    fn sender(&self) -> EventSender;
    fn target_remote_message_id(&self) -> RemoteMessageId;
}

#[derive(Debug, Clone)]
pub struct ReceiptTarget {
    pub remote_message_id: RemoteMessageId,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait RemoteReadReceipt: Send + Sync {
    fn sender(&self) -> EventSender;
    fn timestamp(&self) -> DateTime<Utc>;
    /// If set, takes precedence over scanning `receipt_targets` for the
    /// latest timestamp (spec §4.6 handle_read_receipt).
    fn last_receipt_target(&self) -> Option<RemoteMessageId> {
        None
    }
    fn receipt_targets(&self) -> Vec<ReceiptTarget> {
        Vec::new()
    }
}

#[async_trait]
pub trait RemoteMarkUnread: Send + Sync {
    fn sender(&self) -> EventSender;
    fn unread(&self) -> bool;
}

#[async_trait]
pub trait RemoteTyping: Send + Sync {
    fn sender(&self) -> EventSender;
    /// `TypingWithType` (spec §6): whether this represents typing starting or
    /// stopping, when the network reports it as a discrete event rather than
    /// a membership-style set (contrast with room-side typing, spec §4.5).
    fn is_typing(&self) -> bool;
}

#[async_trait]
pub trait RemoteChatTag: Send + Sync {
    fn sender(&self) -> EventSender;
    fn tag(&self) -> String;
    fn tagged(&self) -> bool;
}

#[async_trait]
pub trait RemoteChatMute: Send + Sync {
    fn sender(&self) -> EventSender;
    fn muted(&self) -> bool;
}

/// Discriminated union over every remote event kind the core dispatches on
/// (spec §6). `DeliveryReceipt` carries no payload: spec §4.6 says it's a
/// no-op. `Unknown` carries the kind name so it can be logged before being
/// dropped.
pub enum RemoteEvent {
    Message(Box<dyn RemoteMessage>),
    Edit(Box<dyn RemoteEdit>),
    Reaction(Box<dyn RemoteReaction>),
    ReactionRemove(Box<dyn RemoteReactionRemove>),
    MessageRemove(Box<dyn RemoteMessageRemove>),
    ReadReceipt(Box<dyn RemoteReadReceipt>),
    MarkUnread(Box<dyn RemoteMarkUnread>),
    DeliveryReceipt,
    Typing(Box<dyn RemoteTyping>),
    ChatTag(Box<dyn RemoteChatTag>),
    ChatMute(Box<dyn RemoteChatMute>),
    Unknown(String),
}

impl RemoteEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            RemoteEvent::Message(_) => "message",
            RemoteEvent::Edit(_) => "edit",
            RemoteEvent::Reaction(_) => "reaction",
            RemoteEvent::ReactionRemove(_) => "reaction_remove",
            RemoteEvent::MessageRemove(_) => "message_remove",
            RemoteEvent::ReadReceipt(_) => "read_receipt",
            RemoteEvent::MarkUnread(_) => "mark_unread",
            RemoteEvent::DeliveryReceipt => "delivery_receipt",
            RemoteEvent::Typing(_) => "typing",
            RemoteEvent::ChatTag(_) => "chat_tag",
            RemoteEvent::ChatMute(_) => "chat_mute",
            RemoteEvent::Unknown(k) => {
                let _ = k;
                "unknown"
            }
        }
    }

    /// `MayCreatePortal` gate (spec §4.6 preconditions).
    pub fn may_create_portal(&self) -> bool {
        matches!(self, RemoteEvent::Message(m) if m.should_create_portal())
    }
}
