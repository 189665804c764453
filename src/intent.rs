//! The acting room-side identity used to send events (spec glossary: Intent)
//! and the resolver that picks one for an incoming remote event (spec §4.4).

use crate::apis::GhostApi;
use crate::ids::{LocalUserId, RemoteUserId};
use crate::remote_event::EventSender;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The bridge bot itself.
    Bot,
    /// A synthetic ghost puppet representing a remote participant.
    Ghost(RemoteUserId),
    /// A real local user's own room-side session, acting as themselves.
    DoublePuppet(LocalUserId),
}

impl Intent {
    pub fn is_double_puppet(&self) -> bool {
        matches!(self, Intent::DoublePuppet(_))
    }
}

/// Resolution order (spec §4.4):
/// 1. `is_from_me` → the source login's user's double-puppet.
/// 2. Else `sender_login` maps to a known login → that login's user's double-puppet.
/// 3. Else fetch/create the Ghost for `sender`, trigger a lazy info refresh.
///
/// Returns `None` when no double-puppet exists and the ghost lookup fails;
/// callers drop the event and log an error (spec §4.4: "Nil means the event
/// is dropped with a logged error.").
pub async fn resolve_intent(
    login_cache: &dyn crate::apis::LoginCache,
    ghost_api: &Arc<dyn GhostApi>,
    sender: &EventSender,
) -> Option<Intent> {
    if sender.is_from_me {
        if let Some(login_id) = &sender.sender_login
            && let Some(user_id) = login_cache.user_for_login(login_id)
            && let Some(intent) = login_cache.double_puppet_intent(&user_id)
        {
            return Some(intent);
        }
    } else if let Some(login_id) = &sender.sender_login
        && login_cache.login_by_id(login_id).is_some()
        && let Some(user_id) = login_cache.user_for_login(login_id)
        && let Some(intent) = login_cache.double_puppet_intent(&user_id)
    {
        return Some(intent);
    }

    match ghost_api.get_or_create_ghost(&sender.sender).await {
        Ok(intent) => {
            ghost_api.trigger_ghost_info_refresh(&sender.sender);
            Some(intent)
        }
        Err(err) => {
            tracing::error!(%err, sender = %sender.sender, "failed to resolve ghost for remote sender");
            None
        }
    }
}
