//! Per-portal typing diff state (spec §4.5, §4.8). Guarded by a plain
//! `std::sync::Mutex` matching the teacher's `TypingTracker.last_typing:
//! StdMutex<HashMap<..>>` — held only for the cheap diff/bookkeeping, never
//! across an awaited network call.

use crate::ids::{LoginId, RoomUserId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

struct TypingInner {
    currently_typing: HashSet<RoomUserId>,
    currently_typing_logins: HashMap<RoomUserId, LoginId>,
    refresher_spawned: bool,
}

pub struct TypingState {
    inner: Mutex<TypingInner>,
}

impl Default for TypingState {
    fn default() -> Self {
        TypingState {
            inner: Mutex::new(TypingInner {
                currently_typing: HashSet::new(),
                currently_typing_logins: HashMap::new(),
                refresher_spawned: false,
            }),
        }
    }
}

impl TypingState {
    /// Diffs the incoming typing set against the stored one (spec §4.5
    /// handle_typing: "Sort incoming user-id list, diff against stored
    /// currently_typing"). Returns (started, stopped).
    pub fn diff(&self, new_typing: &[RoomUserId]) -> (Vec<RoomUserId>, Vec<RoomUserId>) {
        let new_set: HashSet<RoomUserId> = new_typing.iter().cloned().collect();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let started: Vec<RoomUserId> = new_set.difference(&inner.currently_typing).cloned().collect();
        let stopped: Vec<RoomUserId> = inner.currently_typing.difference(&new_set).cloned().collect();
        inner.currently_typing = new_set;
        (started, stopped)
    }

    pub fn record_login(&self, user: RoomUserId, login: LoginId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.currently_typing_logins.insert(user, login);
    }

    pub fn drop_login(&self, user: &RoomUserId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.currently_typing_logins.remove(user);
    }

    /// Snapshot consulted by the periodic refresher (spec §4.5: "re-sends
    /// typing=true for every still-typing user").
    pub fn currently_typing_logins(&self) -> Vec<(RoomUserId, LoginId)> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .currently_typing_logins
            .iter()
            .map(|(u, l)| (u.clone(), l.clone()))
            .collect()
    }

    /// Returns `true` the first time it's called (spec §9 decision 3: the
    /// refresher ticker is spawned lazily per portal on first typing
    /// activity, not eagerly for every portal).
    pub fn mark_refresher_spawned(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.refresher_spawned {
            false
        } else {
            inner.refresher_spawned = true;
            true
        }
    }
}
