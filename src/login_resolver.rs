//! Picks the network login a room-side event should be sent through, or
//! falls back to the portal's relay login (spec §4.3).

use crate::bridge::Bridge;
use crate::error::PortalError;
use crate::ids::LocalUserId;
use crate::model::{NetworkLogin, Portal, UserPortal};

/// Outcome of resolving a local user against a Portal (spec §4.3 Output:
/// `(NetworkLogin?, UserPortal?, error)`). `Relay` stands in for the "nil
/// login, nil user-portal" case: the caller substitutes the portal's relay
/// login and wraps the original sender as an `OrigSender`.
pub enum LoginResolution {
    Login(NetworkLogin, UserPortal),
    Relay,
}

pub async fn resolve(bridge: &Bridge, user_id: &LocalUserId, portal: &Portal) -> Result<LoginResolution, PortalError> {
    let logins = bridge.login_cache.logins_for_user(user_id);

    if logins.is_empty() {
        return Err(PortalError::NotLoggedIn);
    }

    let connected = logins.iter().find(|l| l.connected);

    if let Some(login) = connected {
        let user_portal = bridge
            .user_portal_store
            .get(user_id, &portal.key)
            .await
            .map_err(PortalError::Database)?
            .unwrap_or_else(|| UserPortal::new(user_id.clone(), portal.key.clone()));
        return Ok(LoginResolution::Login(login.clone(), user_portal));
    }

    if !bridge.config.relay_allowed {
        return Err(PortalError::NotLoggedIn);
    }

    if portal.relay_login_id.is_some() {
        return Ok(LoginResolution::Relay);
    }

    tracing::warn!(user = %user_id, "no connected login for user, falling back to a random login");
    let user_portal = bridge
        .user_portal_store
        .get(user_id, &portal.key)
        .await
        .map_err(PortalError::Database)?
        .unwrap_or_else(|| UserPortal::new(user_id.clone(), portal.key.clone()));
    Ok(LoginResolution::Login(logins[0].clone(), user_portal))
}
