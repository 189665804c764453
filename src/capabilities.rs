//! Capability description for a network client/room (design note in spec §9:
//! "a first-class capabilities struct removes the need for casting").
//!
//! The source bridge this core is modeled after probes capabilities with
//! runtime interface assertions (`client.(EditHandlingNetworkAPI)`); Rust has
//! no equivalent cheap downcast for arbitrary traits, so [`NetworkCapabilities`]
//! is returned once by `NetworkApi::get_capabilities` and consulted everywhere
//! a `client.(Foo)` check would otherwise appear.

use std::time::Duration;

/// Whether the network client implements a given capability-gated operation.
/// Mirrors the optional `*HandlingNetworkAPI` mix-in traits of spec §6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    pub edit: bool,
    pub reaction: bool,
    pub redaction: bool,
    pub read_receipt: bool,
    pub typing: bool,
}

/// Room-scoped content capabilities (spec §4.5 handle_message: "Captions,
/// LocationMessages, ..."). Returned together with [`ClientCapabilities`]
/// because both can vary per portal, not just per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomCapabilities {
    pub captions: bool,
    pub location_messages: bool,
    pub edits: bool,
    pub threads: bool,
    pub replies: bool,
    /// 0 means "no cap" (spec §4.5: "If MaxReactions > 0").
    pub max_reactions: u32,
    pub edit_max_age: Option<Duration>,
    pub edit_max_count: Option<u32>,
}

impl Default for RoomCapabilities {
    fn default() -> Self {
        RoomCapabilities {
            captions: false,
            location_messages: false,
            edits: false,
            threads: false,
            replies: true,
            max_reactions: 0,
            edit_max_age: None,
            edit_max_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub client: ClientCapabilities,
    pub room: RoomCapabilities,
}

impl Capabilities {
    pub fn max_reactions(&self) -> Option<u32> {
        (self.room.max_reactions > 0).then_some(self.room.max_reactions)
    }
}
