//! Bridge-wide configuration, read from the environment with documented
//! defaults — same idiom as the teacher's `RateLimitConfig::from_env`.

use std::env;
use std::time::Duration;

/// What happens when a portal's bounded event queue is full (spec §5, §9 open
/// question 1). `Drop` favours liveness of other portals; `Block` favours
/// completeness of the one portal at the cost of stalling its producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOverflowPolicy {
    Drop,
    Block,
}

/// Environment variables:
/// - `PORTAL_QUEUE_CAPACITY` — per-portal event queue depth (default: 64)
/// - `PORTAL_QUEUE_OVERFLOW` — `drop` or `block` (default: drop)
/// - `PORTAL_TYPING_REFRESH_SECS` — typing re-announce cadence (default: 5)
/// - `PORTAL_RELAY_ALLOWED` — whether relaying through a portal's relay login is allowed (default: true)
/// - `PORTAL_EDIT_MAX_AGE_SECS` — bridge-wide fallback max age of an edit target,
///   used when the portal's own `Capabilities` doesn't set one; 0 disables the check (default: 0)
/// - `PORTAL_EDIT_MAX_COUNT` — bridge-wide fallback max edits per message, used when
///   the portal's own `Capabilities` doesn't set one; 0 disables the check (default: 0)
/// - `PORTAL_MAX_REACTIONS` — bridge-wide fallback max reactions per (sender, message),
///   used when the network's `pre_handle_reaction` doesn't report one; 0 disables the cap (default: 0)
/// - `PORTAL_BRIDGE_NAME` — the bridge's own identifier, used as the bridge-info
///   state key and protocol id when creating rooms (default: "portal-bridge")
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub queue_capacity: usize,
    pub queue_overflow: QueueOverflowPolicy,
    pub typing_refresh_interval: Duration,
    pub relay_allowed: bool,
    pub edit_max_age: Option<Duration>,
    pub edit_max_count: Option<u32>,
    pub max_reactions: Option<u32>,
    pub bridge_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            queue_capacity: 64,
            queue_overflow: QueueOverflowPolicy::Drop,
            typing_refresh_interval: Duration::from_secs(5),
            relay_allowed: true,
            edit_max_age: None,
            edit_max_count: None,
            max_reactions: None,
            bridge_name: "portal-bridge".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("PORTAL_QUEUE_CAPACITY")
            && let Ok(n) = val.parse::<usize>()
        {
            config.queue_capacity = n;
        }
        if let Ok(val) = env::var("PORTAL_QUEUE_OVERFLOW") {
            config.queue_overflow = match val.to_lowercase().as_str() {
                "block" => QueueOverflowPolicy::Block,
                _ => QueueOverflowPolicy::Drop,
            };
        }
        if let Ok(val) = env::var("PORTAL_TYPING_REFRESH_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.typing_refresh_interval = Duration::from_secs(n);
        }
        if let Ok(val) = env::var("PORTAL_RELAY_ALLOWED")
            && let Ok(b) = val.parse::<bool>()
        {
            config.relay_allowed = b;
        }
        if let Ok(val) = env::var("PORTAL_EDIT_MAX_AGE_SECS")
            && let Ok(n) = val.parse::<u64>()
            && n > 0
        {
            config.edit_max_age = Some(Duration::from_secs(n));
        }
        if let Ok(val) = env::var("PORTAL_EDIT_MAX_COUNT")
            && let Ok(n) = val.parse::<u32>()
            && n > 0
        {
            config.edit_max_count = Some(n);
        }
        if let Ok(val) = env::var("PORTAL_MAX_REACTIONS")
            && let Ok(n) = val.parse::<u32>()
            && n > 0
        {
            config.max_reactions = Some(n);
        }
        if let Ok(val) = env::var("PORTAL_BRIDGE_NAME") {
            config.bridge_name = val;
        }

        config
    }
}
