//! Identity types shared across the portal core.
//!
//! Mirrors the teacher's flat, `String`-backed id style in `models.rs` (room ids,
//! sender ids, etc. are plain `String`s there) but wraps the bridge's composite
//! keys in newtypes so the two halves of a [`PortalKey`] can't be swapped by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a chat on the network side (e.g. a group id, a channel id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkChatId(pub String);

impl fmt::Display for NetworkChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkChatId {
    fn from(s: &str) -> Self {
        NetworkChatId(s.to_string())
    }
}

/// Local user id that scopes a split portal to a single receiver.
///
/// Empty string means "no receiver" (a shared portal); [`PortalKey::receiverless`]
/// is the canonical way to build that form rather than constructing `Receiver("")` by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Receiver(pub String);

impl Receiver {
    pub fn none() -> Self {
        Receiver(String::new())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Receiver {
    fn from(s: &str) -> Self {
        Receiver(s.to_string())
    }
}

/// (NetworkChatID, Receiver?) — see spec §3. Two forms: *shared* (receiver is
/// empty) and *split* (receiver set, used for DMs with no stable network chat id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortalKey {
    pub chat_id: NetworkChatId,
    pub receiver: Receiver,
}

impl PortalKey {
    pub fn shared(chat_id: impl Into<NetworkChatId>) -> Self {
        PortalKey {
            chat_id: chat_id.into(),
            receiver: Receiver::none(),
        }
    }

    pub fn split(chat_id: impl Into<NetworkChatId>, receiver: impl Into<Receiver>) -> Self {
        PortalKey {
            chat_id: chat_id.into(),
            receiver: receiver.into(),
        }
    }

    pub fn is_split(&self) -> bool {
        !self.receiver.is_none()
    }

    /// The receiver-less form of this key, used as the fallback lookup.
    pub fn receiverless(&self) -> PortalKey {
        PortalKey {
            chat_id: self.chat_id.clone(),
            receiver: Receiver::none(),
        }
    }
}

impl fmt::Display for PortalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.receiver.is_none() {
            write!(f, "{}", self.chat_id)
        } else {
            write!(f, "{}/{}", self.chat_id, self.receiver)
        }
    }
}

/// Room-side room identifier (opaque to the core; collaborator-defined format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room-side event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomEventId(pub String);

impl fmt::Display for RoomEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room-side user identifier (e.g. a Matrix mxid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomUserId(pub String);

impl fmt::Display for RoomUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network-side participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteUserId(pub String);

impl fmt::Display for RemoteUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network-side message identifier. One remote message may map to several
/// room-side events (see [`PartId`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteMessageId(pub String);

impl fmt::Display for RemoteMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one room-side event produced from a single remote message.
/// Empty string is the canonical "only part" id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct PartId(pub String);

impl PartId {
    pub fn only() -> Self {
        PartId(String::new())
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local identifier for a row in the mapping store, used as a stable parent
/// reference in the reply/thread graph instead of a remote message id
/// (spec §3, Message.RelatesToRowID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub i64);

/// Identifies a local user account (room-side, before resolving to a login).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalUserId(pub String);

impl fmt::Display for LocalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one network login belonging to a local user (a user may have several).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoginId(pub String);

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emoji identifier for a reaction (network-specific shortcode, custom emoji id, ...).
/// Empty means "no id, use the literal `Emoji` string" (free-form reactions, spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct EmojiId(pub String);

impl EmojiId {
    pub fn none() -> Self {
        EmojiId(String::new())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}
